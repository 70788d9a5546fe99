// src/utils/reference.rs

use chrono::{DateTime, Utc};
use rand::Rng;

/// Uppercase letters and digits without the easily confused 0/O and 1/I.
const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 8;

/// Generates a participant reference code such as `QZ-M3K9XZ2A-7HQ4TCW8`.
///
/// The middle part is the submission instant in base 36 milliseconds, the
/// tail is random. Codes are collision resistant, not guaranteed unique.
pub fn generate_reference_code(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();

    format!("QZ-{}-{}", to_base36(now.timestamp_millis().max(0) as u64), suffix)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

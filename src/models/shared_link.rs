// src/models/shared_link.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static TEN_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{10}$").expect("valid regex"));

/// Represents the 'shared_links' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SharedLink {
    pub id: Uuid,
    pub mobile_number: String,
    pub share_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin listing row: a link plus the submissions attributed to it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SharedLinkSummary {
    pub id: Uuid,
    pub mobile_number: String,
    pub share_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub submission_count: i64,
}

/// DTO for generating a share link.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateShareLinkRequest {
    #[validate(custom(
        function = validate_ten_digits,
        message = "Please enter a valid 10-digit mobile number"
    ))]
    pub mobile_number: String,
}

#[derive(Debug, Serialize)]
pub struct ShareLinkResponse {
    pub share_code: String,
    pub link: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateShareLinkRequest {
    pub is_active: bool,
}

/// Share codes are the generator's mobile number plus the creation instant.
pub fn share_code_for(mobile_number: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}", mobile_number, now.timestamp_millis())
}

fn validate_ten_digits(mobile: &str) -> Result<(), ValidationError> {
    if TEN_DIGITS.is_match(mobile.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_mobile"))
    }
}

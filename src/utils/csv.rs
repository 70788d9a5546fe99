// src/utils/csv.rs

use crate::models::submission::Submission;

const HEADER: [&str; 8] = [
    "reference_code",
    "participant_name",
    "mobile_number",
    "panchayath",
    "score",
    "answered",
    "referrer_mobile",
    "submitted_at",
];

/// Renders submissions as RFC 4180 CSV with a header row.
pub fn submissions_to_csv(rows: &[Submission]) -> String {
    let mut out = String::new();
    push_record(&mut out, HEADER.iter().map(|h| h.to_string()));

    for s in rows {
        push_record(
            &mut out,
            [
                s.reference_code.clone(),
                s.participant_name.clone(),
                s.mobile_number.clone(),
                s.panchayath.clone(),
                s.score.to_string(),
                s.answers.len().to_string(),
                s.referrer_mobile.clone().unwrap_or_default(),
                s.submitted_at.to_rfc3339(),
            ],
        );
    }

    out
}

fn push_record(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let line: Vec<String> = fields.into_iter().map(|f| escape(&f)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submission::AnswerSet;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    #[test]
    fn escapes_separators_and_quotes() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn header_then_one_line_per_submission() {
        let row = Submission {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            participant_name: "Anu, K".to_string(),
            mobile_number: "9876543210".to_string(),
            panchayath: "Kumily".to_string(),
            answers: Json(AnswerSet::from([(Uuid::new_v4(), "A".to_string())])),
            score: 1,
            reference_code: "QZ-1-ABC".to_string(),
            referrer_mobile: None,
            question_order: Json(Vec::new()),
            submitted_at: Utc::now(),
        };

        let csv = submissions_to_csv(&[row]);
        let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("reference_code,participant_name"));
        assert!(lines[1].starts_with("QZ-1-ABC,\"Anu, K\",9876543210,Kumily,1,1,,"));
    }
}

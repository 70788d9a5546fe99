// src/models/submission.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

/// Participant answers keyed by question id.
pub type AnswerSet = BTreeMap<Uuid, String>;

/// Represents the 'submissions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub participant_name: String,
    pub mobile_number: String,
    pub panchayath: String,
    pub answers: Json<AnswerSet>,
    pub score: i32,
    pub reference_code: String,
    pub referrer_mobile: Option<String>,
    /// Question ids in the order they were presented.
    pub question_order: Json<Vec<Uuid>>,
    pub submitted_at: DateTime<Utc>,
}

/// A submission about to be written. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub quiz_id: Uuid,
    pub participant_name: String,
    pub mobile_number: String,
    pub panchayath: String,
    pub answers: AnswerSet,
    pub score: i32,
    pub reference_code: String,
    pub referrer_mobile: Option<String>,
    pub question_order: Vec<Uuid>,
    pub submitted_at: DateTime<Utc>,
}

impl NewSubmission {
    pub fn into_submission(self, id: Uuid) -> Submission {
        Submission {
            id,
            quiz_id: self.quiz_id,
            participant_name: self.participant_name,
            mobile_number: self.mobile_number,
            panchayath: self.panchayath,
            answers: Json(self.answers),
            score: self.score,
            reference_code: self.reference_code,
            referrer_mobile: self.referrer_mobile,
            question_order: Json(self.question_order),
            submitted_at: self.submitted_at,
        }
    }
}

/// Confirmation shown to the participant once the submission is stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionReceipt {
    pub submission_id: Uuid,
    pub reference_code: String,
    pub score: i32,
    pub total_questions: usize,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionListParams {
    pub quiz_id: Option<Uuid>,
}

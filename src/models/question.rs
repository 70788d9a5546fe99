// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::utils::html::clean_html;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,

    /// Owning quiz.
    pub quiz_id: Uuid,

    /// The text content of the question.
    pub question_text: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Must equal one of `options` for the question to ever score.
    pub correct_answer: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Whether the stored answer key can ever award a point.
    pub fn is_answerable(&self) -> bool {
        self.has_option(&self.correct_answer)
    }
}

/// DTO for sending question to participants (excludes the correct answer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text.clone(),
            options: q.options.0.clone(),
        }
    }
}

/// A sanitized, validated question ready to be written.
/// Checked again after sanitizing since markup can clean down to nothing.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = validate_draft_answer))]
pub struct QuestionDraft {
    pub quiz_id: Uuid,
    #[validate(length(min = 1, message = "Question text is empty after sanitizing"))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1))]
    pub correct_answer: String,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_answer_in_options))]
pub struct CreateQuestionRequest {
    pub quiz_id: Uuid,
    #[validate(length(min = 1, max = 1000))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
}

impl CreateQuestionRequest {
    pub fn into_draft(self) -> Result<QuestionDraft, ValidationErrors> {
        let draft = QuestionDraft {
            quiz_id: self.quiz_id,
            question_text: clean_html(self.question_text.trim()).trim().to_string(),
            options: self
                .options
                .iter()
                .map(|o| clean_html(o.trim()).trim().to_string())
                .collect(),
            correct_answer: clean_html(self.correct_answer.trim()).trim().to_string(),
        };
        draft.validate()?;
        Ok(draft)
    }
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuestionRequest {
    pub quiz_id: Option<Uuid>,
    pub question_text: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.quiz_id.is_none()
            && self.question_text.is_none()
            && self.options.is_none()
            && self.correct_answer.is_none()
    }

    /// Overlays the changes on the stored row so the merged question can be
    /// validated as a whole.
    pub fn merge(self, current: Question) -> CreateQuestionRequest {
        CreateQuestionRequest {
            quiz_id: self.quiz_id.unwrap_or(current.quiz_id),
            question_text: self.question_text.unwrap_or(current.question_text),
            options: self.options.unwrap_or(current.options.0),
            correct_answer: self.correct_answer.unwrap_or(current.correct_answer),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    pub quiz_id: Option<Uuid>,
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() < 2 {
        return Err(ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_answer_in_options(req: &CreateQuestionRequest) -> Result<(), ValidationError> {
    let answer = req.correct_answer.trim();
    if req.options.iter().any(|o| o.trim() == answer) {
        Ok(())
    } else {
        Err(ValidationError::new("correct_answer_not_in_options")
            .with_message("Correct answer must match one of the options".into()))
    }
}

fn validate_draft_answer(draft: &QuestionDraft) -> Result<(), ValidationError> {
    if draft.options.contains(&draft.correct_answer) {
        Ok(())
    } else {
        Err(ValidationError::new("correct_answer_not_in_options")
            .with_message("Correct answer must match one of the options".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: &[&str], answer: &str) -> CreateQuestionRequest {
        CreateQuestionRequest {
            quiz_id: Uuid::new_v4(),
            question_text: "Capital of Kerala?".to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: answer.to_string(),
        }
    }

    #[test]
    fn accepts_answer_among_options() {
        let req = request(&["Kochi", "Thiruvananthapuram", "Kozhikode", "Thrissur"], "Thiruvananthapuram");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn rejects_answer_outside_options() {
        let req = request(&["A", "B", "C", "D"], "E");
        let errors = req.validate().unwrap_err();
        assert!(errors.to_string().contains("Correct answer must match"));
    }

    #[test]
    fn rejects_blank_option() {
        let req = request(&["A", "  ", "C"], "A");
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_single_option() {
        let req = request(&["A"], "A");
        assert!(req.validate().is_err());
    }

    #[test]
    fn draft_trims_and_sanitizes() {
        let mut req = request(&[" A ", "B"], " A");
        req.question_text = "<script>alert(1)</script>Pick one".to_string();
        let draft = req.into_draft().unwrap();
        assert_eq!(draft.question_text, "Pick one");
        assert_eq!(draft.options, vec!["A", "B"]);
        assert_eq!(draft.correct_answer, "A");
    }

    #[test]
    fn option_that_sanitizes_to_nothing_is_rejected() {
        let req = request(&["<script>x</script>", "B"], "B");
        assert!(req.validate().is_ok());

        let errors = req.into_draft().unwrap_err();
        assert!(errors.field_errors().contains_key("options"));
    }

    #[test]
    fn markup_only_question_text_is_rejected() {
        let mut req = request(&["A", "B"], "A");
        req.question_text = "<script>alert(1)</script>".to_string();
        assert!(req.into_draft().is_err());
    }

    #[test]
    fn merge_keeps_unchanged_fields() {
        let now = Utc::now();
        let current = Question {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            question_text: "Old".to_string(),
            options: Json(vec!["A".to_string(), "B".to_string()]),
            correct_answer: "A".to_string(),
            created_at: now,
            updated_at: now,
        };
        let quiz_id = current.quiz_id;
        let merged = UpdateQuestionRequest {
            correct_answer: Some("B".to_string()),
            ..Default::default()
        }
        .merge(current);
        assert_eq!(merged.quiz_id, quiz_id);
        assert_eq!(merged.question_text, "Old");
        assert_eq!(merged.correct_answer, "B");
        assert!(merged.validate().is_ok());
    }
}

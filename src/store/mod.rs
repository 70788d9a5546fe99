// src/store/mod.rs

//! Persistence seams.
//!
//! The session controller and the admin handlers only talk to these traits.
//! `PgStore` backs them with PostgreSQL, `MemoryStore` keeps everything in
//! process for development and tests.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    admin::AdminUser,
    question::{Question, QuestionDraft},
    quiz::{CreateQuizRequest, Quiz, UpdateQuizRequest},
    shared_link::{SharedLink, SharedLinkSummary},
    submission::{AnswerSet, NewSubmission, Submission},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("record already exists")]
    Duplicate,

    /// The write conflicts with dependent rows.
    #[error("{0}")]
    Conflict(String),

    #[error("record not found")]
    NotFound,

    /// Network or database failure; the caller may retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::Conflict("Record is referenced by other data".to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Read side of quiz content used by participant sessions.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// The quiz participants currently see. When several are active the most
    /// recently created one wins.
    async fn active_quiz(&self) -> Result<Option<Quiz>, StoreError>;

    /// Questions of a quiz in authoring order.
    async fn questions_for(&self, quiz_id: Uuid) -> Result<Vec<Question>, StoreError>;
}

#[async_trait]
pub trait ScoringService: Send + Sync {
    /// One point per question of `quiz_id` answered with its correct option.
    /// `None` means the service produced no value.
    async fn calculate_score(
        &self,
        quiz_id: Uuid,
        answers: &AnswerSet,
    ) -> Result<Option<i32>, StoreError>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn exists(&self, mobile_number: &str, quiz_id: Uuid) -> Result<bool, StoreError>;

    /// Returns `StoreError::Duplicate` when (mobile_number, quiz_id) is taken.
    async fn insert(&self, submission: NewSubmission) -> Result<Uuid, StoreError>;

    /// Newest first.
    async fn list(&self, quiz_id: Option<Uuid>) -> Result<Vec<Submission>, StoreError>;
}

#[async_trait]
pub trait SharedLinkStore: Send + Sync {
    async fn create_link(&self, mobile_number: &str, share_code: &str)
    -> Result<SharedLink, StoreError>;

    async fn find_active_link(&self, share_code: &str) -> Result<Option<SharedLink>, StoreError>;

    async fn record_link_submission(
        &self,
        link_id: Uuid,
        submission_id: Uuid,
    ) -> Result<(), StoreError>;

    /// Newest first, with attributed submission counts.
    async fn list_links(&self) -> Result<Vec<SharedLinkSummary>, StoreError>;

    async fn set_link_active(&self, link_id: Uuid, active: bool) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_admin(&self, username: &str) -> Result<Option<AdminUser>, StoreError>;
    async fn create_admin(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StoreError>;
    async fn create_quiz(&self, req: CreateQuizRequest) -> Result<Quiz, StoreError>;
    async fn update_quiz(&self, id: Uuid, changes: UpdateQuizRequest) -> Result<Quiz, StoreError>;
    async fn delete_quiz(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_questions(&self, quiz_id: Option<Uuid>) -> Result<Vec<Question>, StoreError>;
    async fn get_question(&self, id: Uuid) -> Result<Option<Question>, StoreError>;
    async fn create_question(&self, draft: QuestionDraft) -> Result<Question, StoreError>;
    async fn update_question(&self, id: Uuid, draft: QuestionDraft) -> Result<Question, StoreError>;
    async fn delete_question(&self, id: Uuid) -> Result<(), StoreError>;
    async fn count_questions(&self) -> Result<i64, StoreError>;
}

/// Every store the application needs, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub questions: Arc<dyn QuestionStore>,
    pub scoring: Arc<dyn ScoringService>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub links: Arc<dyn SharedLinkStore>,
    pub admin: Arc<dyn AdminStore>,
}

impl Stores {
    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            questions: store.clone(),
            scoring: store.clone(),
            submissions: store.clone(),
            links: store.clone(),
            admin: store,
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            questions: store.clone(),
            scoring: store.clone(),
            submissions: store.clone(),
            links: store.clone(),
            admin: store,
        }
    }
}

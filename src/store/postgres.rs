// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use super::{
    AdminStore, QuestionStore, ScoringService, SharedLinkStore, StoreError, SubmissionStore,
};
use crate::models::{
    admin::AdminUser,
    question::{Question, QuestionDraft},
    quiz::{CreateQuizRequest, Quiz, QuizStatus, UpdateQuizRequest},
    shared_link::{SharedLink, SharedLinkSummary},
    submission::{AnswerSet, NewSubmission, Submission},
};

const QUIZ_COLUMNS: &str = "id, title, description, status, created_at, updated_at";
const QUESTION_COLUMNS: &str =
    "id, quiz_id, question_text, options, correct_answer, created_at, updated_at";
const SUBMISSION_COLUMNS: &str = "id, quiz_id, participant_name, mobile_number, panchayath, \
     answers, score, reference_code, referrer_mobile, question_order, submitted_at";
const LINK_COLUMNS: &str = "id, mobile_number, share_code, is_active, created_at";

/// Logs the failing operation before converting the error.
fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| {
        tracing::error!("{}: {:?}", context, e);
        StoreError::from(e)
    }
}

/// PostgreSQL-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn active_quiz(&self) -> Result<Option<Quiz>, StoreError> {
        sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes \
             WHERE status = 'active' \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch active quiz"))
    }

    async fn questions_for(&self, quiz_id: Uuid) -> Result<Vec<Question>, StoreError> {
        sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions \
             WHERE quiz_id = $1 \
             ORDER BY created_at, id"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch quiz questions"))
    }
}

#[async_trait]
impl ScoringService for PgStore {
    async fn calculate_score(
        &self,
        quiz_id: Uuid,
        answers: &AnswerSet,
    ) -> Result<Option<i32>, StoreError> {
        sqlx::query_scalar::<_, Option<i32>>("SELECT calculate_quiz_score($1, $2)")
            .bind(quiz_id)
            .bind(Json(answers))
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to calculate score"))
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn exists(&self, mobile_number: &str, quiz_id: Uuid) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM submissions WHERE mobile_number = $1 AND quiz_id = $2)",
        )
        .bind(mobile_number)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check for existing submission"))
    }

    async fn insert(&self, submission: NewSubmission) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO submissions
            (id, quiz_id, participant_name, mobile_number, panchayath, answers,
             score, reference_code, referrer_mobile, question_order, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(id)
        .bind(submission.quiz_id)
        .bind(&submission.participant_name)
        .bind(&submission.mobile_number)
        .bind(&submission.panchayath)
        .bind(Json(&submission.answers))
        .bind(submission.score)
        .bind(&submission.reference_code)
        .bind(&submission.referrer_mobile)
        .bind(Json(&submission.question_order))
        .bind(submission.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Duplicate => StoreError::Duplicate,
            other => {
                tracing::error!("Failed to insert submission: {}", other);
                other
            }
        })?;

        Ok(id)
    }

    async fn list(&self, quiz_id: Option<Uuid>) -> Result<Vec<Submission>, StoreError> {
        sqlx::query_as::<_, Submission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions \
             WHERE ($1::uuid IS NULL OR quiz_id = $1) \
             ORDER BY submitted_at DESC"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list submissions"))
    }
}

#[async_trait]
impl SharedLinkStore for PgStore {
    async fn create_link(
        &self,
        mobile_number: &str,
        share_code: &str,
    ) -> Result<SharedLink, StoreError> {
        sqlx::query_as::<_, SharedLink>(&format!(
            "INSERT INTO shared_links (id, mobile_number, share_code) \
             VALUES ($1, $2, $3) \
             RETURNING {LINK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(mobile_number)
        .bind(share_code)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create share link"))
    }

    async fn find_active_link(&self, share_code: &str) -> Result<Option<SharedLink>, StoreError> {
        sqlx::query_as::<_, SharedLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM shared_links WHERE share_code = $1 AND is_active"
        ))
        .bind(share_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to look up share link"))
    }

    async fn record_link_submission(
        &self,
        link_id: Uuid,
        submission_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO shared_link_submissions (shared_link_id, submission_id) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(link_id)
        .bind(submission_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to attribute submission to share link"))?;

        Ok(())
    }

    async fn list_links(&self) -> Result<Vec<SharedLinkSummary>, StoreError> {
        sqlx::query_as::<_, SharedLinkSummary>(
            r#"
            SELECT
                l.id, l.mobile_number, l.share_code, l.is_active, l.created_at,
                COUNT(s.submission_id) AS submission_count
            FROM shared_links l
            LEFT JOIN shared_link_submissions s ON s.shared_link_id = l.id
            GROUP BY l.id
            ORDER BY l.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list share links"))
    }

    async fn set_link_active(&self, link_id: Uuid, active: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE shared_links SET is_active = $1 WHERE id = $2")
            .bind(active)
            .bind(link_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update share link"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn find_admin(&self, username: &str) -> Result<Option<AdminUser>, StoreError> {
        sqlx::query_as::<_, AdminUser>(
            "SELECT id, username, password_hash, created_at FROM admin_users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Admin lookup failed"))
    }

    async fn create_admin(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO admin_users (id, username, password_hash) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to create admin user"))?;

        Ok(())
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StoreError> {
        sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list quizzes"))
    }

    async fn create_quiz(&self, req: CreateQuizRequest) -> Result<Quiz, StoreError> {
        sqlx::query_as::<_, Quiz>(&format!(
            "INSERT INTO quizzes (id, title, description, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {QUIZ_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.title)
        .bind(req.description)
        .bind(req.status.unwrap_or(QuizStatus::Inactive))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create quiz"))
    }

    async fn update_quiz(&self, id: Uuid, changes: UpdateQuizRequest) -> Result<Quiz, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE quizzes SET ");
        let mut separated = builder.separated(", ");

        if let Some(title) = changes.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }

        if let Some(description) = changes.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }

        if let Some(status) = changes.status {
            separated.push("status = ");
            separated.push_bind_unseparated(status);
        }

        separated.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(QUIZ_COLUMNS);

        builder
            .build_query_as::<Quiz>()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to update quiz"))?
            .ok_or(StoreError::NotFound)
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match StoreError::from(e) {
                StoreError::Conflict(_) => {
                    StoreError::Conflict("Quiz already has submissions".to_string())
                }
                other => {
                    tracing::error!("Failed to delete quiz: {}", other);
                    other
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn list_questions(&self, quiz_id: Option<Uuid>) -> Result<Vec<Question>, StoreError> {
        sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions \
             WHERE ($1::uuid IS NULL OR quiz_id = $1) \
             ORDER BY created_at, id"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list questions"))
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>, StoreError> {
        sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch question"))
    }

    async fn create_question(&self, draft: QuestionDraft) -> Result<Question, StoreError> {
        sqlx::query_as::<_, Question>(&format!(
            "INSERT INTO questions (id, quiz_id, question_text, options, correct_answer) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(draft.quiz_id)
        .bind(draft.question_text)
        .bind(Json(draft.options))
        .bind(draft.correct_answer)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create question"))
    }

    async fn update_question(&self, id: Uuid, draft: QuestionDraft) -> Result<Question, StoreError> {
        sqlx::query_as::<_, Question>(&format!(
            "UPDATE questions \
             SET quiz_id = $2, question_text = $3, options = $4, correct_answer = $5, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(id)
        .bind(draft.quiz_id)
        .bind(draft.question_text)
        .bind(Json(draft.options))
        .bind(draft.correct_answer)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update question"))?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_question(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete question"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn count_questions(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count questions"))
    }
}

// src/store/memory.rs

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use super::{
    AdminStore, QuestionStore, ScoringService, SharedLinkStore, StoreError, SubmissionStore,
};
use crate::{
    models::{
        admin::AdminUser,
        question::{Question, QuestionDraft},
        quiz::{CreateQuizRequest, Quiz, QuizStatus, UpdateQuizRequest},
        shared_link::{SharedLink, SharedLinkSummary},
        submission::{AnswerSet, NewSubmission, Submission},
    },
    scoring::score_answers,
};

#[derive(Default)]
struct Tables {
    admins: Vec<AdminUser>,
    quizzes: Vec<Quiz>,
    questions: Vec<Question>,
    submissions: Vec<Submission>,
    links: Vec<SharedLink>,
    link_submissions: Vec<(Uuid, Uuid)>,
}

/// In-process store with the same constraints as the SQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Inserts an active quiz with `(text, options, correct_answer)` questions.
    pub fn seed_quiz(&self, title: &str, questions: &[(&str, &[&str], &str)]) -> (Quiz, Vec<Question>) {
        let now = Utc::now();
        let quiz = Quiz {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            status: QuizStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let rows: Vec<Question> = questions
            .iter()
            .map(|(text, options, answer)| Question {
                id: Uuid::new_v4(),
                quiz_id: quiz.id,
                question_text: text.to_string(),
                options: Json(options.iter().map(|o| o.to_string()).collect()),
                correct_answer: answer.to_string(),
                created_at: now,
                updated_at: now,
            })
            .collect();

        if let Ok(mut tables) = self.tables.lock() {
            tables.quizzes.push(quiz.clone());
            tables.questions.extend(rows.iter().cloned());
        }

        (quiz, rows)
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn active_quiz(&self) -> Result<Option<Quiz>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .quizzes
            .iter()
            .filter(|q| q.status == QuizStatus::Active)
            .max_by_key(|q| q.created_at)
            .cloned())
    }

    async fn questions_for(&self, quiz_id: Uuid) -> Result<Vec<Question>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScoringService for MemoryStore {
    async fn calculate_score(
        &self,
        quiz_id: Uuid,
        answers: &AnswerSet,
    ) -> Result<Option<i32>, StoreError> {
        let tables = self.tables()?;
        let answer_key: HashMap<Uuid, String> = tables
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .map(|q| (q.id, q.correct_answer.clone()))
            .collect();

        Ok(Some(score_answers(answers, &answer_key)))
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn exists(&self, mobile_number: &str, quiz_id: Uuid) -> Result<bool, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .submissions
            .iter()
            .any(|s| s.mobile_number == mobile_number && s.quiz_id == quiz_id))
    }

    async fn insert(&self, submission: NewSubmission) -> Result<Uuid, StoreError> {
        let mut tables = self.tables()?;

        if !tables.quizzes.iter().any(|q| q.id == submission.quiz_id) {
            return Err(StoreError::Conflict("Quiz does not exist".to_string()));
        }

        let taken = tables.submissions.iter().any(|s| {
            s.mobile_number == submission.mobile_number && s.quiz_id == submission.quiz_id
        });
        if taken {
            return Err(StoreError::Duplicate);
        }

        let id = Uuid::new_v4();
        tables.submissions.push(submission.into_submission(id));
        Ok(id)
    }

    async fn list(&self, quiz_id: Option<Uuid>) -> Result<Vec<Submission>, StoreError> {
        let tables = self.tables()?;
        let mut rows: Vec<Submission> = tables
            .submissions
            .iter()
            .filter(|s| quiz_id.is_none_or(|id| s.quiz_id == id))
            .cloned()
            .collect();
        rows.reverse();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(rows)
    }
}

#[async_trait]
impl SharedLinkStore for MemoryStore {
    async fn create_link(
        &self,
        mobile_number: &str,
        share_code: &str,
    ) -> Result<SharedLink, StoreError> {
        let mut tables = self.tables()?;
        if tables.links.iter().any(|l| l.share_code == share_code) {
            return Err(StoreError::Duplicate);
        }

        let link = SharedLink {
            id: Uuid::new_v4(),
            mobile_number: mobile_number.to_string(),
            share_code: share_code.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        tables.links.push(link.clone());
        Ok(link)
    }

    async fn find_active_link(&self, share_code: &str) -> Result<Option<SharedLink>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .links
            .iter()
            .find(|l| l.share_code == share_code && l.is_active)
            .cloned())
    }

    async fn record_link_submission(
        &self,
        link_id: Uuid,
        submission_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        let pair = (link_id, submission_id);
        if !tables.link_submissions.contains(&pair) {
            tables.link_submissions.push(pair);
        }
        Ok(())
    }

    async fn list_links(&self) -> Result<Vec<SharedLinkSummary>, StoreError> {
        let tables = self.tables()?;
        let mut rows: Vec<SharedLinkSummary> = tables
            .links
            .iter()
            .rev()
            .map(|l| SharedLinkSummary {
                id: l.id,
                mobile_number: l.mobile_number.clone(),
                share_code: l.share_code.clone(),
                is_active: l.is_active,
                created_at: l.created_at,
                submission_count: tables
                    .link_submissions
                    .iter()
                    .filter(|(link_id, _)| *link_id == l.id)
                    .count() as i64,
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn set_link_active(&self, link_id: Uuid, active: bool) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        let link = tables
            .links
            .iter_mut()
            .find(|l| l.id == link_id)
            .ok_or(StoreError::NotFound)?;
        link.is_active = active;
        Ok(())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_admin(&self, username: &str) -> Result<Option<AdminUser>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.admins.iter().find(|a| a.username == username).cloned())
    }

    async fn create_admin(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.admins.iter().any(|a| a.username == username) {
            return Err(StoreError::Duplicate);
        }
        tables.admins.push(AdminUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StoreError> {
        let tables = self.tables()?;
        let mut rows: Vec<Quiz> = tables.quizzes.iter().rev().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn create_quiz(&self, req: CreateQuizRequest) -> Result<Quiz, StoreError> {
        let mut tables = self.tables()?;
        let now = Utc::now();
        let quiz = Quiz {
            id: Uuid::new_v4(),
            title: req.title,
            description: req.description,
            status: req.status.unwrap_or(QuizStatus::Inactive),
            created_at: now,
            updated_at: now,
        };
        tables.quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn update_quiz(&self, id: Uuid, changes: UpdateQuizRequest) -> Result<Quiz, StoreError> {
        let mut tables = self.tables()?;
        let quiz = tables
            .quizzes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(title) = changes.title {
            quiz.title = title;
        }
        if let Some(description) = changes.description {
            quiz.description = Some(description);
        }
        if let Some(status) = changes.status {
            quiz.status = status;
        }
        quiz.updated_at = Utc::now();

        Ok(quiz.clone())
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.submissions.iter().any(|s| s.quiz_id == id) {
            return Err(StoreError::Conflict("Quiz already has submissions".to_string()));
        }

        let before = tables.quizzes.len();
        tables.quizzes.retain(|q| q.id != id);
        if tables.quizzes.len() == before {
            return Err(StoreError::NotFound);
        }
        tables.questions.retain(|q| q.quiz_id != id);
        Ok(())
    }

    async fn list_questions(&self, quiz_id: Option<Uuid>) -> Result<Vec<Question>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .questions
            .iter()
            .filter(|q| quiz_id.is_none_or(|id| q.quiz_id == id))
            .cloned()
            .collect())
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn create_question(&self, draft: QuestionDraft) -> Result<Question, StoreError> {
        let mut tables = self.tables()?;
        if !tables.quizzes.iter().any(|q| q.id == draft.quiz_id) {
            return Err(StoreError::Conflict("Quiz does not exist".to_string()));
        }

        let now = Utc::now();
        let question = Question {
            id: Uuid::new_v4(),
            quiz_id: draft.quiz_id,
            question_text: draft.question_text,
            options: Json(draft.options),
            correct_answer: draft.correct_answer,
            created_at: now,
            updated_at: now,
        };
        tables.questions.push(question.clone());
        Ok(question)
    }

    async fn update_question(&self, id: Uuid, draft: QuestionDraft) -> Result<Question, StoreError> {
        let mut tables = self.tables()?;
        if !tables.quizzes.iter().any(|q| q.id == draft.quiz_id) {
            return Err(StoreError::Conflict("Quiz does not exist".to_string()));
        }

        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or(StoreError::NotFound)?;
        question.quiz_id = draft.quiz_id;
        question.question_text = draft.question_text;
        question.options = Json(draft.options);
        question.correct_answer = draft.correct_answer;
        question.updated_at = Utc::now();

        Ok(question.clone())
    }

    async fn delete_question(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        let before = tables.questions.len();
        tables.questions.retain(|q| q.id != id);
        if tables.questions.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn count_questions(&self) -> Result<i64, StoreError> {
        let tables = self.tables()?;
        Ok(tables.questions.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(quiz_id: Uuid, mobile: &str) -> NewSubmission {
        NewSubmission {
            quiz_id,
            participant_name: "Anu".to_string(),
            mobile_number: mobile.to_string(),
            panchayath: "Kumily".to_string(),
            answers: AnswerSet::new(),
            score: 0,
            reference_code: "REF".to_string(),
            referrer_mobile: None,
            question_order: Vec::new(),
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn second_insert_for_same_mobile_and_quiz_is_duplicate() {
        let store = MemoryStore::new();
        let (quiz, _) = store.seed_quiz("Quiz", &[("Q", &["A", "B"], "A")]);

        store.insert(submission(quiz.id, "9876543210")).await.unwrap();
        let second = store.insert(submission(quiz.id, "9876543210")).await;

        assert!(matches!(second, Err(StoreError::Duplicate)));
        assert!(store.exists("9876543210", quiz.id).await.unwrap());
    }

    #[tokio::test]
    async fn same_mobile_may_answer_different_quizzes() {
        let store = MemoryStore::new();
        let (first, _) = store.seed_quiz("First", &[("Q", &["A", "B"], "A")]);
        let (second, _) = store.seed_quiz("Second", &[("Q", &["A", "B"], "A")]);

        store.insert(submission(first.id, "9876543210")).await.unwrap();
        store.insert(submission(second.id, "9876543210")).await.unwrap();

        assert_eq!(store.list(None).await.unwrap().len(), 2);
        assert_eq!(store.list(Some(first.id)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn newest_active_quiz_wins() {
        let store = MemoryStore::new();
        store.seed_quiz("Older", &[]);
        let (newer, _) = store.seed_quiz("Newer", &[]);

        let active = store.active_quiz().await.unwrap().unwrap();
        assert_eq!(active.id, newer.id);
    }

    #[tokio::test]
    async fn scoring_uses_only_the_quiz_answer_key() {
        let store = MemoryStore::new();
        let (quiz, questions) = store.seed_quiz(
            "Quiz",
            &[("q1", &["A", "B", "C"], "B"), ("q2", &["A", "C", "D"], "C")],
        );
        let (_, other) = store.seed_quiz("Other", &[("x", &["A", "B"], "A")]);

        let answers = AnswerSet::from([
            (questions[0].id, "B".to_string()),
            (questions[1].id, "D".to_string()),
            (other[0].id, "A".to_string()),
        ]);

        let score = store.calculate_score(quiz.id, &answers).await.unwrap();
        assert_eq!(score, Some(1));
    }

    #[tokio::test]
    async fn quiz_with_submissions_cannot_be_deleted() {
        let store = MemoryStore::new();
        let (quiz, _) = store.seed_quiz("Quiz", &[("Q", &["A", "B"], "A")]);
        store.insert(submission(quiz.id, "9876543210")).await.unwrap();

        let result = store.delete_quiz(quiz.id).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn link_counts_follow_attributions() {
        let store = MemoryStore::new();
        let link = store.create_link("9876543210", "9876543210_1").await.unwrap();
        let sub = Uuid::new_v4();

        store.record_link_submission(link.id, sub).await.unwrap();
        store.record_link_submission(link.id, sub).await.unwrap();

        let links = store.list_links().await.unwrap();
        assert_eq!(links[0].submission_count, 1);

        store.set_link_active(link.id, false).await.unwrap();
        assert!(store.find_active_link("9876543210_1").await.unwrap().is_none());
    }
}

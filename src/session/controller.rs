// src/session/controller.rs

use std::fmt;

use chrono::Utc;
use rand::seq::SliceRandom;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::SessionError;
use crate::{
    config::SessionSettings,
    models::{
        participant::RegistrationForm,
        question::PublicQuestion,
        quiz::Quiz,
        shared_link::SharedLink,
        submission::{AnswerSet, NewSubmission, SubmissionReceipt},
    },
    store::{QuestionStore, StoreError, Stores},
    utils::reference::generate_reference_code,
};

/// Lifecycle of a participant session. Transitions only ever move forward,
/// except `Submitting -> Answering` when a write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    Registration,
    Answering,
    Submitting,
    Completed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::Registration => "registration",
            SessionState::Answering => "answering",
            SessionState::Submitting => "submitting",
            SessionState::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who asked for the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    User,
    Timeout,
}

/// Outcome of `next`.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved(usize),
    Submitted(SubmissionReceipt),
}

/// Outcome of one countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Nothing to count down.
    Idle,
    Running(u32),
    /// The budget just reached zero.
    Expired,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizInfo {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

/// Snapshot of a session as the participant sees it. Correct answers are
/// never part of it.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: SessionState,
    pub quiz: Option<QuizInfo>,
    pub total_questions: usize,
    pub current_index: usize,
    pub current_question: Option<PublicQuestion>,
    pub selected_option: Option<String>,
    pub answered_count: usize,
    pub time_budget_seconds: u32,
    pub remaining_seconds: u32,
    pub registration: Option<RegistrationForm>,
    pub receipt: Option<SubmissionReceipt>,
    pub last_error: Option<String>,
}

/// One participant's attempt at the active quiz.
#[derive(Debug)]
pub struct QuizSession {
    id: Uuid,
    settings: SessionSettings,
    state: SessionState,
    quiz: Option<Quiz>,
    questions: Vec<PublicQuestion>,
    /// Number of questions the quiz has in total; bounds the score.
    quiz_question_count: usize,
    answers: AnswerSet,
    current: usize,
    registration: Option<RegistrationForm>,
    share_link: Option<SharedLink>,
    time_budget: u32,
    remaining: u32,
    receipt: Option<SubmissionReceipt>,
    last_error: Option<String>,
}

impl QuizSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            settings,
            state: SessionState::Loading,
            quiz: None,
            questions: Vec::new(),
            quiz_question_count: 0,
            answers: AnswerSet::new(),
            current: 0,
            registration: None,
            share_link: None,
            time_budget: 0,
            remaining: 0,
            receipt: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn questions(&self) -> &[PublicQuestion] {
        &self.questions
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fetches the active quiz and fixes the question sequence for this
    /// session. On failure the session stays in `Loading`.
    pub async fn load(&mut self, store: &dyn QuestionStore) -> Result<(), SessionError> {
        self.expect_state(SessionState::Loading, "load the quiz")?;

        let quiz = store
            .active_quiz()
            .await
            .map_err(service_error)?
            .ok_or(SessionError::QuizUnavailable)?;

        let mut questions = store.questions_for(quiz.id).await.map_err(service_error)?;
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        for question in questions.iter().filter(|q| !q.is_answerable()) {
            tracing::warn!(
                "Question {} of quiz {} has a correct answer outside its options",
                question.id,
                quiz.id
            );
        }

        self.quiz_question_count = questions.len();

        if let Some(limit) = self.settings.questions_per_session {
            if limit < questions.len() {
                questions.shuffle(&mut rand::rng());
                questions.truncate(limit);
            }
        }

        self.questions = questions.iter().map(PublicQuestion::from).collect();
        self.time_budget = self.questions.len() as u32 * self.settings.seconds_per_question;
        self.remaining = self.time_budget;

        tracing::info!(
            "Session {} loaded quiz {} with {} questions ({}s)",
            self.id,
            quiz.id,
            self.questions.len(),
            self.time_budget
        );

        self.quiz = Some(quiz);
        self.state = SessionState::Registration;
        Ok(())
    }

    /// Validates the participant and starts the countdown.
    ///
    /// A mobile number that already submitted this quiz is rejected before
    /// any question is shown.
    pub async fn register(
        &mut self,
        form: RegistrationForm,
        stores: &Stores,
    ) -> Result<(), SessionError> {
        self.expect_state(SessionState::Registration, "register")?;

        let form = form.normalized();
        form.validate()
            .map_err(|e| SessionError::Validation(e.to_string()))?;

        let quiz_id = self.quiz_id()?;
        self.registration = Some(form.clone());

        let taken = stores
            .submissions
            .exists(&form.mobile_number, quiz_id)
            .await
            .map_err(service_error)?;
        if taken {
            tracing::info!(
                "Rejected registration for quiz {}: mobile already submitted",
                quiz_id
            );
            return Err(SessionError::AlreadySubmitted);
        }

        self.share_link = None;
        if let Some(code) = &form.share_code {
            match stores.links.find_active_link(code).await {
                Ok(link) => self.share_link = link,
                Err(e) => tracing::warn!("Share code lookup failed for {}: {}", code, e),
            }
        }

        self.current = 0;
        self.remaining = self.time_budget;
        self.last_error = None;
        self.state = SessionState::Answering;
        Ok(())
    }

    /// Records (or replaces) the answer for a presented question.
    pub fn select_answer(&mut self, question_id: Uuid, option: String) -> Result<(), SessionError> {
        self.expect_state(SessionState::Answering, "change answers")?;
        if self.remaining == 0 {
            return Err(SessionError::TimeExpired);
        }

        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or(SessionError::UnknownQuestion)?;
        if !question.options.contains(&option) {
            return Err(SessionError::UnknownOption);
        }

        self.answers.insert(question_id, option);
        Ok(())
    }

    /// Moves forward, or submits when the current question is the last one.
    pub async fn next(&mut self, stores: &Stores) -> Result<Advance, SessionError> {
        self.expect_state(SessionState::Answering, "move to the next question")?;

        let current = &self.questions[self.current];
        if !self.answers.contains_key(&current.id) {
            return Err(SessionError::AnswerRequired);
        }

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            Ok(Advance::Moved(self.current))
        } else {
            self.submit(stores, SubmitTrigger::User)
                .await
                .map(Advance::Submitted)
        }
    }

    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.expect_state(SessionState::Answering, "move to the previous question")?;
        self.current = self.current.saturating_sub(1);
        Ok(self.current)
    }

    /// One second of countdown. Only runs while answering.
    pub fn tick(&mut self) -> Tick {
        if self.state != SessionState::Answering || self.remaining == 0 {
            return Tick::Idle;
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    /// Scores and writes the submission.
    ///
    /// Runs at most once to completion. A failed write puts the session back
    /// into `Answering` with every answer intact so the participant can retry.
    pub async fn submit(
        &mut self,
        stores: &Stores,
        trigger: SubmitTrigger,
    ) -> Result<SubmissionReceipt, SessionError> {
        self.expect_state(SessionState::Answering, "submit")?;

        if trigger == SubmitTrigger::User && self.remaining > 0 && !self.on_answered_last_question()
        {
            return Err(SessionError::NotReadyToSubmit);
        }

        let quiz_id = self.quiz_id()?;
        let registration = self.registration.clone().ok_or(SessionError::InvalidState {
            action: "submit",
            state: self.state,
        })?;

        self.state = SessionState::Submitting;

        match self.write_submission(stores, quiz_id, registration).await {
            Ok(receipt) => {
                tracing::info!(
                    "Session {} submitted {} ({:?}) with score {}/{}",
                    self.id,
                    receipt.reference_code,
                    trigger,
                    receipt.score,
                    receipt.total_questions
                );
                self.state = SessionState::Completed;
                self.last_error = None;
                self.receipt = Some(receipt.clone());
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!("Session {} submission failed: {}", self.id, e);
                self.state = SessionState::Answering;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn view(&self) -> SessionView {
        let answering = matches!(
            self.state,
            SessionState::Answering | SessionState::Submitting
        );
        let current_question = if answering {
            self.questions.get(self.current).cloned()
        } else {
            None
        };
        let selected_option = current_question
            .as_ref()
            .and_then(|q| self.answers.get(&q.id).cloned());

        SessionView {
            session_id: self.id,
            state: self.state,
            quiz: self.quiz.as_ref().map(|q| QuizInfo {
                id: q.id,
                title: q.title.clone(),
                description: q.description.clone(),
            }),
            total_questions: self.questions.len(),
            current_index: self.current,
            current_question,
            selected_option,
            answered_count: self.answers.len(),
            time_budget_seconds: self.time_budget,
            remaining_seconds: self.remaining,
            registration: self.registration.clone(),
            receipt: self.receipt.clone(),
            last_error: self.last_error.clone(),
        }
    }

    async fn write_submission(
        &self,
        stores: &Stores,
        quiz_id: Uuid,
        registration: RegistrationForm,
    ) -> Result<SubmissionReceipt, SessionError> {
        let raw_score = stores
            .scoring
            .calculate_score(quiz_id, &self.answers)
            .await
            .map_err(service_error)?
            .unwrap_or(0);

        let max_score = self.quiz_question_count as i32;
        let score = raw_score.clamp(0, max_score);
        if score != raw_score {
            tracing::warn!(
                "Scoring returned {} for quiz {} (max {}), clamped",
                raw_score,
                quiz_id,
                max_score
            );
        }

        let submitted_at = Utc::now();
        let reference_code = generate_reference_code(submitted_at);
        let referrer_mobile = registration
            .referrer_mobile
            .or_else(|| self.share_link.as_ref().map(|l| l.mobile_number.clone()));

        let submission = NewSubmission {
            quiz_id,
            participant_name: registration.participant_name,
            mobile_number: registration.mobile_number,
            panchayath: registration.panchayath,
            answers: self.answers.clone(),
            score,
            reference_code: reference_code.clone(),
            referrer_mobile,
            question_order: self.questions.iter().map(|q| q.id).collect(),
            submitted_at,
        };

        let submission_id = match stores.submissions.insert(submission).await {
            Ok(id) => id,
            Err(StoreError::Duplicate) => return Err(SessionError::AlreadySubmitted),
            Err(e) => return Err(service_error(e)),
        };

        if let Some(link) = &self.share_link {
            if let Err(e) = stores
                .links
                .record_link_submission(link.id, submission_id)
                .await
            {
                tracing::warn!(
                    "Could not attribute submission {} to share link {}: {}",
                    submission_id,
                    link.share_code,
                    e
                );
            }
        }

        Ok(SubmissionReceipt {
            submission_id,
            reference_code,
            score,
            total_questions: self.questions.len(),
            submitted_at,
        })
    }

    fn on_answered_last_question(&self) -> bool {
        self.current + 1 == self.questions.len()
            && self
                .questions
                .get(self.current)
                .is_some_and(|q| self.answers.contains_key(&q.id))
    }

    fn quiz_id(&self) -> Result<Uuid, SessionError> {
        self.quiz
            .as_ref()
            .map(|q| q.id)
            .ok_or(SessionError::QuizUnavailable)
    }

    fn expect_state(&self, expected: SessionState, action: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                action,
                state: self.state,
            })
        }
    }
}

fn service_error(err: StoreError) -> SessionError {
    SessionError::Service(err.to_string())
}

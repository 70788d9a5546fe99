// src/session/mod.rs

//! Participant quiz sessions.
//!
//! `controller` holds the per-participant state machine, `registry` owns the
//! live sessions and their countdown tasks.

pub mod controller;
pub mod registry;

use thiserror::Error;

pub use controller::{Advance, QuizSession, SessionState, SessionView, SubmitTrigger, Tick};
pub use registry::SessionRegistry;

/// Everything a participant action can fail with. Each variant maps to a
/// user-visible message; none of them is fatal.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Quiz unavailable: there is no active quiz right now")]
    QuizUnavailable,

    #[error("Quiz unavailable: the active quiz has no questions yet")]
    NoQuestions,

    #[error("This mobile number has already submitted this quiz")]
    AlreadySubmitted,

    #[error("{0}")]
    Validation(String),

    #[error("Cannot {action} while the session is {state}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error("Please select an answer before continuing")]
    AnswerRequired,

    #[error("Question is not part of this session")]
    UnknownQuestion,

    #[error("Option is not one of the question's choices")]
    UnknownOption,

    #[error("Time is up, answers can no longer be changed")]
    TimeExpired,

    #[error("Answer the last question before submitting")]
    NotReadyToSubmit,

    #[error("Temporary failure, please try again: {0}")]
    Service(String),
}

impl SessionError {
    /// Whether repeating the same action later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Service(_))
    }
}

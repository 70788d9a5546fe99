// src/handlers/session.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{participant::RegistrationForm, quiz::ActiveQuizSummary},
    session::SessionRegistry,
    store::Stores,
};

#[derive(Debug, Deserialize)]
pub struct SelectAnswerRequest {
    pub question_id: Uuid,
    pub option: String,
}

/// Title and size of the quiz a new session would load.
pub async fn active_quiz(State(stores): State<Stores>) -> Result<impl IntoResponse, AppError> {
    let quiz = stores
        .questions
        .active_quiz()
        .await?
        .ok_or_else(|| AppError::NotFound("No active quiz right now".to_string()))?;
    let question_count = stores.questions.questions_for(quiz.id).await?.len();

    Ok(Json(ActiveQuizSummary {
        id: quiz.id,
        title: quiz.title,
        description: quiz.description,
        question_count,
    }))
}

/// Opens a session on the active quiz.
/// Returns 201 with the session in `registration` state.
pub async fn open_session(
    State(sessions): State<SessionRegistry>,
    State(stores): State<Stores>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.open(&stores).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(sessions): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.view(id).await?))
}

/// Validates participant details and starts the timer.
pub async fn register(
    State(sessions): State<SessionRegistry>,
    State(stores): State<Stores>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RegistrationForm>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.register(id, payload, &stores).await?))
}

pub async fn select_answer(
    State(sessions): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions
        .select_answer(id, payload.question_id, payload.option)
        .await?;
    Ok(Json(view))
}

/// Advances to the next question, submitting on the last one.
pub async fn next(
    State(sessions): State<SessionRegistry>,
    State(stores): State<Stores>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.next(id, &stores).await?))
}

pub async fn previous(
    State(sessions): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.previous(id).await?))
}

/// Explicit submission, also used to retry after a failed write.
pub async fn submit(
    State(sessions): State<SessionRegistry>,
    State(stores): State<Stores>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.submit(id, &stores).await?))
}

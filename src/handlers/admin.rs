// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    leaderboard,
    models::{
        admin::{LoginRequest, LoginResponse},
        question::{CreateQuestionRequest, QuestionListParams, UpdateQuestionRequest},
        quiz::{CreateQuizRequest, UpdateQuizRequest},
        shared_link::UpdateShareLinkRequest,
        submission::SubmissionListParams,
    },
    store::Stores,
    utils::{
        csv::submissions_to_csv,
        hash::verify_password,
        jwt::{ADMIN_ROLE, Claims, sign_jwt},
    },
};

/// Authenticates an admin and returns a JWT token.
///
/// Unknown usernames and wrong passwords get the same answer.
pub async fn login(
    State(stores): State<Stores>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let invalid = || AppError::AuthError("Invalid username or password".to_string());

    let admin = stores
        .admin
        .find_admin(&payload.username)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &admin.password_hash)? {
        tracing::warn!("Failed admin login for {}", payload.username);
        return Err(invalid());
    }

    let token = sign_jwt(
        &admin.username,
        ADMIN_ROLE,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!("Admin {} logged in", admin.username);

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        username: admin.username,
        expires_in: config.jwt_expiration,
    }))
}

pub async fn list_quizzes(State(stores): State<Stores>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(stores.admin.list_quizzes().await?))
}

pub async fn create_quiz(
    State(stores): State<Stores>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let quiz = stores.admin.create_quiz(payload).await?;
    tracing::info!("Quiz {} created ({:?})", quiz.id, quiz.status);

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Partial update; activating a quiz makes it the one new sessions load.
pub async fn update_quiz(
    State(stores): State<Stores>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    payload.validate()?;

    Ok(Json(stores.admin.update_quiz(id, payload).await?))
}

/// Deletes a quiz and its questions. Refused once the quiz has submissions.
pub async fn delete_quiz(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    stores.admin.delete_quiz(id).await?;
    tracing::info!("Quiz {} deleted by {}", id, claims.sub);
    Ok(StatusCode::NO_CONTENT)
}

/// Lists questions with their answer keys, optionally for one quiz.
pub async fn list_questions(
    State(stores): State<Stores>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(stores.admin.list_questions(params.quiz_id).await?))
}

pub async fn create_question(
    State(stores): State<Stores>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = stores.admin.create_question(payload.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// Merges the changes onto the stored question and validates the result, so
/// the answer key can never drift outside the options.
pub async fn update_question(
    State(stores): State<Stores>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let current = stores
        .admin
        .get_question(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let merged = payload.merge(current);
    merged.validate()?;

    Ok(Json(
        stores.admin.update_question(id, merged.into_draft()?).await?,
    ))
}

pub async fn delete_question(
    State(stores): State<Stores>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    stores.admin.delete_question(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_submissions(
    State(stores): State<Stores>,
    Query(params): Query<SubmissionListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(stores.submissions.list(params.quiz_id).await?))
}

/// Same rows as `list_submissions`, as a CSV download.
pub async fn export_submissions(
    State(stores): State<Stores>,
    Query(params): Query<SubmissionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = stores.submissions.list(params.quiz_id).await?;
    let body = submissions_to_csv(&rows);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"submissions.csv\"",
            ),
        ],
        body,
    ))
}

pub async fn dashboard(State(stores): State<Stores>) -> Result<impl IntoResponse, AppError> {
    let submissions = stores.submissions.list(None).await?;
    let total_questions = stores.admin.count_questions().await?;
    Ok(Json(leaderboard::dashboard(&submissions, total_questions)))
}

pub async fn list_share_links(State(stores): State<Stores>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(stores.links.list_links().await?))
}

/// Enables or disables a share link. Disabled codes no longer resolve a
/// referrer.
pub async fn update_share_link(
    State(stores): State<Stores>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShareLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    stores.links.set_link_active(id, payload.is_active).await?;
    Ok(StatusCode::OK)
}

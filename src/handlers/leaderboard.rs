// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    leaderboard::{self, DEFAULT_TOP},
    store::Stores,
};

const MAX_TOP: usize = 50;

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    /// Defaults to the active quiz.
    pub quiz_id: Option<Uuid>,
    pub limit: Option<usize>,
}

impl LeaderboardParams {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_TOP).clamp(1, MAX_TOP)
    }
}

/// Resolves the quiz a leaderboard is about. `None` when nothing is active.
async fn target_quiz(stores: &Stores, params: &LeaderboardParams) -> Result<Option<Uuid>, AppError> {
    match params.quiz_id {
        Some(id) => Ok(Some(id)),
        None => Ok(stores.questions.active_quiz().await?.map(|q| q.id)),
    }
}

/// Top scorers of a quiz; earlier submissions win ties.
pub async fn winners(
    State(stores): State<Stores>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let Some(quiz_id) = target_quiz(&stores, &params).await? else {
        return Ok(Json(Vec::<leaderboard::Winner>::new()));
    };

    let submissions = stores.submissions.list(Some(quiz_id)).await?;
    Ok(Json(leaderboard::winners(&submissions, params.limit())))
}

/// Participants who brought in the most submissions, across all quizzes.
pub async fn referrals(
    State(stores): State<Stores>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = stores.submissions.list(params.quiz_id).await?;
    Ok(Json(leaderboard::referral_champions(
        &submissions,
        params.limit(),
    )))
}

pub async fn panchayaths(
    State(stores): State<Stores>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = stores.submissions.list(params.quiz_id).await?;
    Ok(Json(leaderboard::panchayath_rankings(&submissions)))
}

// src/handlers/share.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use url::Url;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::shared_link::{CreateShareLinkRequest, ShareLinkResponse, share_code_for},
    store::{StoreError, Stores},
};

/// `<base>/quiz?ref=<code>`
pub fn share_url(base: &str, share_code: &str) -> Result<String, AppError> {
    let mut url = Url::parse(base)
        .and_then(|base| base.join("quiz"))
        .map_err(|e| AppError::InternalServerError(format!("Invalid PUBLIC_BASE_URL: {e}")))?;
    url.query_pairs_mut().append_pair("ref", share_code);
    Ok(url.to_string())
}

/// Generates a share link for a participant's mobile number.
pub async fn create_share_link(
    State(stores): State<Stores>,
    State(config): State<Config>,
    Json(payload): Json<CreateShareLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mobile = payload.mobile_number.trim();
    let share_code = share_code_for(mobile, Utc::now());

    let link = stores
        .links
        .create_link(mobile, &share_code)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate => {
                AppError::Conflict("Share link was just generated, try again".to_string())
            }
            other => AppError::from(other),
        })?;

    tracing::info!("Share link {} created", link.share_code);

    let response = ShareLinkResponse {
        link: share_url(&config.public_base_url, &link.share_code)?,
        share_code: link.share_code,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_points_at_quiz_page() {
        let link = share_url("https://quiz.example.org", "9876543210_1700000000000").unwrap();
        assert_eq!(link, "https://quiz.example.org/quiz?ref=9876543210_1700000000000");
    }

    #[test]
    fn base_path_is_kept() {
        let link = share_url("https://example.org/kerala/", "abc").unwrap();
        assert_eq!(link, "https://example.org/kerala/quiz?ref=abc");
    }
}

// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, leaderboard, session, share},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (quiz, sessions, share links, leaderboard, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (config, stores, live sessions).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let session_routes = Router::new()
        .route("/", post(session::open_session))
        .route("/{id}", get(session::get_session))
        .route("/{id}/registration", post(session::register))
        .route("/{id}/answers", put(session::select_answer))
        .route("/{id}/next", post(session::next))
        .route("/{id}/previous", post(session::previous))
        .route("/{id}/submit", post(session::submit));

    let leaderboard_routes = Router::new()
        .route("/winners", get(leaderboard::winners))
        .route("/referrals", get(leaderboard::referrals))
        .route("/panchayaths", get(leaderboard::panchayaths));

    let admin_routes = Router::new()
        .route(
            "/quizzes",
            get(admin::list_quizzes).post(admin::create_quiz),
        )
        .route(
            "/quizzes/{id}",
            put(admin::update_quiz).delete(admin::delete_quiz),
        )
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/submissions", get(admin::list_submissions))
        .route("/submissions/export", get(admin::export_submissions))
        .route("/dashboard", get(admin::dashboard))
        .route("/share-links", get(admin::list_share_links))
        .route("/share-links/{id}", put(admin::update_share_link))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .route("/login", post(admin::login));

    Router::new()
        .route("/api/quiz/active", get(session::active_quiz))
        .route("/api/share-links", post(share::create_share_link))
        .nest("/api/sessions", session_routes)
        .nest("/api/leaderboard", leaderboard_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::{Config, SessionSettings},
        store::{MemoryStore, Stores},
    };

    fn app() -> Router {
        let config = Config {
            database_url: None,
            jwt_secret: "router-test".to_string(),
            jwt_expiration: 60,
            rust_log: "error".to_string(),
            admin_username: None,
            admin_password: None,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            public_base_url: "http://localhost:3000".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string(), "bad\norigin".to_string()],
            session: SessionSettings::default(),
        };
        create_router(AppState::new(config, Stores::memory(MemoryStore::new())))
    }

    #[tokio::test]
    async fn admin_routes_are_guarded_but_login_is_not() {
        let response = app()
            .oneshot(
                Request::get("/api/admin/submissions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app()
            .oneshot(
                Request::post("/api/admin/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username":"nobody","password":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let response = app()
            .oneshot(
                Request::options("/api/sessions")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }
}

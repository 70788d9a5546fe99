// src/config.rs

use std::{env, net::SocketAddr, str::FromStr};

use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

/// Default time budget per presented question.
pub const SECONDS_PER_QUESTION: u32 = 60;

/// Sessions older than this are dropped from the registry.
pub const SESSION_TTL_SECONDS: u64 = 2 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Tunables for participant sessions.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Size of the random subset presented to each participant.
    /// `None` presents every question of the active quiz.
    pub questions_per_session: Option<usize>,
    pub seconds_per_question: u32,
    pub ttl_seconds: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            questions_per_session: None,
            seconds_per_question: SECONDS_PER_QUESTION,
            ttl_seconds: SESSION_TTL_SECONDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL URL. When unset the in-memory store is used.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub bind_addr: SocketAddr,
    /// Origin used when building share links.
    pub public_base_url: String,
    pub cors_origins: Vec<String>,
    pub session: SessionSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = optional("DATABASE_URL");

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = parsed("JWT_EXPIRATION")?.unwrap_or(24 * 60 * 60);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = parsed("BIND_ADDR")?.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let public_base_url =
            optional("PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        if Url::parse(&public_base_url).is_err() {
            return Err(ConfigError::Invalid {
                key: "PUBLIC_BASE_URL",
                value: public_base_url,
            });
        }

        let cors_origins = optional("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        let questions_per_session = parsed::<usize>("QUESTIONS_PER_SESSION")?.filter(|n| *n > 0);
        let seconds_per_question = parsed("SECONDS_PER_QUESTION")?.unwrap_or(SECONDS_PER_QUESTION);
        let ttl_seconds = parsed("SESSION_TTL_SECONDS")?.unwrap_or(SESSION_TTL_SECONDS);

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: optional("ADMIN_USERNAME"),
            admin_password: optional("ADMIN_PASSWORD"),
            bind_addr,
            public_base_url,
            cors_origins,
            session: SessionSettings {
                questions_per_session,
                seconds_per_question,
                ttl_seconds,
            },
        })
    }
}

fn optional(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(None),
    }
}

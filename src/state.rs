// src/state.rs

use axum::extract::FromRef;

use crate::{config::Config, session::SessionRegistry, store::Stores};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub stores: Stores,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: Config, stores: Stores) -> Self {
        let sessions = SessionRegistry::new(config.session.clone());
        Self {
            config,
            stores,
            sessions,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Stores {
    fn from_ref(state: &AppState) -> Self {
        state.stores.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

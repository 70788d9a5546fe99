// tests/common/mod.rs

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use quiz_portal::{
    config::{Config, SessionSettings},
    routes,
    state::AppState,
    store::{AdminStore, MemoryStore, Stores},
    utils::hash::hash_password,
};

pub const ADMIN_USERNAME: &str = "quizadmin";
pub const ADMIN_PASSWORD: &str = "correct-horse";

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Logs in as the seeded admin and returns the bearer token.
    pub async fn admin_token(&self) -> String {
        let response = self
            .client
            .post(self.url("/api/admin/login"))
            .json(&serde_json::json!({
                "username": ADMIN_USERNAME,
                "password": ADMIN_PASSWORD,
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        public_base_url: "https://quiz.example.org".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        session: SessionSettings::default(),
    }
}

/// Spawns the app on a random port backed by a fresh in-memory store with
/// one admin account.
pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let hashed = hash_password(ADMIN_PASSWORD).unwrap();
    store
        .create_admin(ADMIN_USERNAME, &hashed)
        .await
        .expect("Failed to seed admin");

    let stores = Stores {
        questions: store.clone(),
        scoring: store.clone(),
        submissions: store.clone(),
        links: store.clone(),
        admin: store.clone(),
    };

    let app = routes::create_router(AppState::new(test_config(), stores));

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

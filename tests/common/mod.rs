#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use ledger_api_rust::app::{router, AppState};
use ledger_api_rust::config::AppConfig;
use ledger_api_rust::types::Domain;

/// Router over a fresh in-memory backend, driven with `oneshot`
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

// Concurrent CREATE TABLE IF NOT EXISTS can still collide in the catalog
static SCHEMA_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    // Keep hashing fast in tests
    config.security.bcrypt_cost = 4;
    config.api.enable_request_logging = false;
    config
}

impl TestApp {
    pub fn new() -> Self {
        let config = test_config();
        let state = AppState::in_memory(&config).expect("in-memory state");
        let router = router(state.clone(), &config);
        Self { router, state }
    }

    /// Same router over the Postgres database in `DATABASE_URL`; `None` when unset
    pub async fn postgres() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        let Some(url) = url else {
            eprintln!("DATABASE_URL not set, skipping Postgres test");
            return None;
        };

        let mut config = test_config();
        config.database.url = Some(url);
        config.database.max_connections = 5;
        config.database.connection_timeout = 10;

        let state = {
            let _schema = SCHEMA_LOCK.lock().await;
            AppState::connect(&config).await.expect("postgres state")
        };
        let router = router(state.clone(), &config);
        Some(Self { router, state })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("request")).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Register a user and return a fresh user token
    pub async fn user_token(&self, username: &str) -> String {
        let creds = json!({ "username": username, "password": "pw-123" });
        let (status, body) = self
            .request(Method::POST, "/auth/register", None, Some(creds.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        let (status, body) = self.request(Method::POST, "/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().expect("token").to_string()
    }

    /// Create an admin directly in the store and return a fresh admin token
    pub async fn admin_token(&self, username: &str) -> String {
        self.state
            .credentials
            .create(Domain::Admin, username, "admin-pw")
            .await
            .expect("create admin");

        let creds = json!({ "username": username, "password": "admin-pw" });
        let (status, body) = self.request(Method::POST, "/admin/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
        body["token"].as_str().expect("token").to_string()
    }
}

/// Asserts the error envelope and returns the message
pub fn error_message(body: &Value) -> &str {
    assert_eq!(body["success"], false, "not an error envelope: {}", body);
    assert!(body["code"].is_string(), "missing code: {}", body);
    body["error"].as_str().expect("error message")
}

/// The real server binary on a free port, killed on drop
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ledger-api-rust"));
        cmd.env("LEDGER_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            // Empty rather than unset so a local .env cannot point the server at a real database
            .env("DATABASE_URL", "")
            .env("JWT_SECRET", "server-test-user-secret")
            .env("ADMIN_JWT_SECRET", "server-test-admin-secret")
            .env("SECURITY_BCRYPT_COST", "4")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

mod common;

use std::time::Duration;

use anyhow::Result;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn binary_serves_register_login_and_records() -> Result<()> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(15)).await?;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["storage"], "memory");

    let creds = json!({ "username": "smoke", "password": "smoke-pw" });
    let resp = client
        .post(format!("{}/auth/register", server.base_url))
        .json(&creds)
        .send()
        .await?;
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let login: Value = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&creds)
        .send()
        .await?
        .json()
        .await?;
    let token = login["token"].as_str().expect("token in login response");

    let resp = client
        .post(format!("{}/expenses", server.base_url))
        .bearer_auth(token)
        .json(&json!({ "title": "Coffee", "amount": 4.2 }))
        .send()
        .await?;
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let list: Value = client
        .get(format!("{}/expenses", server.base_url))
        .bearer_auth(token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn binary_rejects_unauthenticated_requests() -> Result<()> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(15)).await?;

    let resp = reqwest::get(format!("{}/todo", server.base_url)).await?;
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await?;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    Ok(())
}

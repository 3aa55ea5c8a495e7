// handlers/public/accounts.rs - POST /auth/register, /auth/login, /admin/login

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::JsonBody;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Domain;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /auth/register - Create an end-user account
///
/// Returns 201 `{ "message": "User created", "userId": "<uuid>" }`.
/// A taken username is a 400.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Credentials>,
) -> ApiResult<Value> {
    let user = state.accounts.register(&body.username, &body.password).await?;
    Ok(ApiResponse::created(json!({
        "message": "User created",
        "userId": user.id
    })))
}

/// POST /auth/login - Exchange user credentials for a user token
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Credentials>,
) -> ApiResult<Value> {
    let (_, token) = state
        .accounts
        .login(Domain::User, &body.username, &body.password)
        .await?;
    Ok(ApiResponse::ok(json!({ "token": token })))
}

/// POST /admin/login - Exchange admin credentials for an admin token
pub async fn admin_login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Credentials>,
) -> ApiResult<Value> {
    let (admin, token) = state
        .accounts
        .login(Domain::Admin, &body.username, &body.password)
        .await?;
    Ok(ApiResponse::ok(json!({
        "token": token,
        "username": admin.username
    })))
}

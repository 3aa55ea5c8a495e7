// handlers/elevated/users.rs - /admin/users[/:id]
//
// Password hashes are never serialized; `Principal` skips them.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::api::{ApiPath, JsonBody};
use crate::app::AppState;
use crate::database::models::Principal;
use crate::handlers::public::accounts::Credentials;
use crate::middleware::{ApiResponse, ApiResult, AuthAdmin};

#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// GET /admin/users
pub async fn list(State(state): State<AppState>, AuthAdmin(_): AuthAdmin) -> ApiResult<Vec<Principal>> {
    let users = state.accounts.list_users().await?;
    Ok(ApiResponse::ok(users))
}

/// POST /admin/users - Returns 201 `{ "id", "username" }`
pub async fn create(
    State(state): State<AppState>,
    AuthAdmin(ctx): AuthAdmin,
    JsonBody(body): JsonBody<Credentials>,
) -> ApiResult<Value> {
    let user = state.accounts.create_user(&body.username, &body.password).await?;
    info!("Admin '{}' created user '{}'", ctx.username, user.username);
    Ok(ApiResponse::created(json!({
        "id": user.id,
        "username": user.username
    })))
}

/// GET /admin/users/:id
pub async fn get(
    State(state): State<AppState>,
    AuthAdmin(_): AuthAdmin,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Principal> {
    let user = state.accounts.get_user(id).await?;
    Ok(ApiResponse::ok(user))
}

/// PUT /admin/users/:id - Rename and/or reset the password
pub async fn update(
    State(state): State<AppState>,
    AuthAdmin(ctx): AuthAdmin,
    ApiPath(id): ApiPath<Uuid>,
    JsonBody(body): JsonBody<UpdateUser>,
) -> ApiResult<Principal> {
    let user = state
        .accounts
        .update_user(id, body.username.as_deref(), body.password.as_deref())
        .await?;
    info!("Admin '{}' updated user {}", ctx.username, id);
    Ok(ApiResponse::ok(user))
}

/// DELETE /admin/users/:id - Removes the user and all of their records
pub async fn delete(
    State(state): State<AppState>,
    AuthAdmin(ctx): AuthAdmin,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    state.accounts.delete_user(id).await?;
    info!("Admin '{}' deleted user {}", ctx.username, id);
    Ok(ApiResponse::ok(json!({ "message": "User deleted" })))
}

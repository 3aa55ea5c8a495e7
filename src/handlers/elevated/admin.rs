use axum::extract::State;

use crate::app::AppState;
use crate::database::models::Principal;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthAdmin};
use crate::types::Domain;

/// GET /admin/me - The calling admin, without secrets
pub async fn me(State(state): State<AppState>, AuthAdmin(ctx): AuthAdmin) -> ApiResult<Principal> {
    let admin = state
        .credentials
        .find_by_id(Domain::Admin, ctx.principal_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;
    Ok(ApiResponse::ok(admin))
}

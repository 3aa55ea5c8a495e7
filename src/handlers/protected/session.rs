use axum::extract::State;

use crate::app::AppState;
use crate::database::models::Principal;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::types::Domain;

/// GET /auth/me - The calling user, without secrets
pub async fn me(State(state): State<AppState>, AuthUser(ctx): AuthUser) -> ApiResult<Principal> {
    let user = state
        .credentials
        .find_by_id(Domain::User, ctx.principal_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;
    Ok(ApiResponse::ok(user))
}

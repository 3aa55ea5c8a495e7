// handlers/protected/expenses.rs - /expenses[/:id]

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{ApiPath, ApiQuery, JsonBody, ListQuery};
use crate::app::AppState;
use crate::database::models::{Expense, ExpensePatch, NewExpense};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /expenses - The caller's expenses, newest first unless `?sort=` says otherwise
pub async fn list(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<Expense>> {
    let order = query.order::<Expense>()?;
    let expenses = state.expenses.list(ctx.principal_id, order).await?;
    Ok(ApiResponse::ok(expenses))
}

/// POST /expenses
pub async fn create(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    JsonBody(body): JsonBody<NewExpense>,
) -> ApiResult<Expense> {
    let expense = state.expenses.create(ctx.principal_id, body).await?;
    Ok(ApiResponse::created(expense))
}

/// GET /expenses/:id
pub async fn get(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Expense> {
    let expense = state.expenses.find(ctx.principal_id, id).await?;
    Ok(ApiResponse::ok(expense))
}

/// PUT /expenses/:id - Partial update
pub async fn update(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    JsonBody(patch): JsonBody<ExpensePatch>,
) -> ApiResult<Expense> {
    let expense = state.expenses.update(ctx.principal_id, id, patch).await?;
    Ok(ApiResponse::ok(expense))
}

/// DELETE /expenses/:id
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    state.expenses.delete(ctx.principal_id, id).await?;
    Ok(ApiResponse::ok(json!({ "message": "Expense deleted" })))
}

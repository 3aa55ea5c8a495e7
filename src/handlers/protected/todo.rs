// handlers/protected/todo.rs - /todo[/:id] and nested subtasks

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{ApiPath, ApiQuery, JsonBody, ListQuery};
use crate::app::AppState;
use crate::database::models::{NewSubtask, NewTodo, Subtask, SubtaskPatch, Todo, TodoPatch};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /todo
pub async fn list(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<Todo>> {
    let order = query.order::<Todo>()?;
    let todos = state.todos.list(ctx.principal_id, order).await?;
    Ok(ApiResponse::ok(todos))
}

/// POST /todo
pub async fn create(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    JsonBody(body): JsonBody<NewTodo>,
) -> ApiResult<Todo> {
    let todo = state.todos.create(ctx.principal_id, body).await?;
    Ok(ApiResponse::created(todo))
}

/// GET /todo/:id
pub async fn get(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Todo> {
    let todo = state.todos.find(ctx.principal_id, id).await?;
    Ok(ApiResponse::ok(todo))
}

/// PUT /todo/:id - Partial update; `"dueDate": null` clears the due date
pub async fn update(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    JsonBody(patch): JsonBody<TodoPatch>,
) -> ApiResult<Todo> {
    let todo = state.todos.update(ctx.principal_id, id, patch).await?;
    Ok(ApiResponse::ok(todo))
}

/// DELETE /todo/:id
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    state.todos.delete(ctx.principal_id, id).await?;
    Ok(ApiResponse::ok(json!({ "message": "Todo deleted" })))
}

/// GET /todo/:id/subtasks
pub async fn list_subtasks(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Vec<Subtask>> {
    let subtasks = state.todos.list_subtasks(ctx.principal_id, id).await?;
    Ok(ApiResponse::ok(subtasks))
}

/// POST /todo/:id/subtasks - Append a subtask; responds with the parent todo
pub async fn add_subtask(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    JsonBody(body): JsonBody<NewSubtask>,
) -> ApiResult<Todo> {
    let (todo, _) = state.todos.add_subtask(ctx.principal_id, id, body).await?;
    Ok(ApiResponse::created(todo))
}

/// PUT /todo/:id/subtasks/:sub_id
pub async fn update_subtask(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath((id, sub_id)): ApiPath<(Uuid, Uuid)>,
    JsonBody(patch): JsonBody<SubtaskPatch>,
) -> ApiResult<Todo> {
    let todo = state.todos.update_subtask(ctx.principal_id, id, sub_id, patch).await?;
    Ok(ApiResponse::ok(todo))
}

/// DELETE /todo/:id/subtasks/:sub_id
pub async fn remove_subtask(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath((id, sub_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Todo> {
    let todo = state.todos.remove_subtask(ctx.principal_id, id, sub_id).await?;
    Ok(ApiResponse::ok(todo))
}

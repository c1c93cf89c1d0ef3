//! Todo endpoints. Every todo is private to its owner; other users' todos
//! are reported as missing.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::error::{
    ApiError, JsonBody, ResourceId, ResultExt, max_length, optional_non_blank, required,
};
use crate::auth::Auth;
use crate::db::{Database, Todo};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::pagination::{
    CREATED_AT, Page, PageParams, PageRequest, Sort, SortDirection, SortField, TITLE, UPDATED_AT,
};

const TITLE_MAX_LEN: usize = 255;

/// Title that makes `PATCH /todos/{id}` answer 503, for exercising client
/// retry handling.
const MAINTENANCE_TITLE: &str = "maintenance";

const SORTABLE: &[SortField] = &[CREATED_AT, UPDATED_AT, TITLE];
const DEFAULT_SORT: Sort = Sort::new(CREATED_AT, SortDirection::Desc);

#[derive(Clone)]
pub struct TodosState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(TodosState);

pub fn router(state: TodosState) -> Router {
    Router::new()
        .route("/", get(list_todos).post(create_todo))
        .route(
            "/{id}",
            get(get_todo).patch(update_todo).delete(delete_todo),
        )
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateTodoRequest {
    title: Option<String>,
}

#[derive(Deserialize)]
struct UpdateTodoRequest {
    title: Option<String>,
    completed: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TodoResponse {
    id: i64,
    title: String,
    completed: bool,
    created_at: String,
    updated_at: String,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            completed: todo.completed,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

fn todo_not_found() -> ApiError {
    ApiError::not_found("TODO_NOT_FOUND", "Todo not found")
}

async fn load_todo(db: &Database, id: i64, user_id: i64) -> Result<Todo, ApiError> {
    db.todos()
        .get(id, user_id)
        .await
        .db_err("Failed to get todo")?
        .ok_or_else(todo_not_found)
}

async fn list_todos(
    State(state): State<TodosState>,
    auth: Auth,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let request = PageRequest::from_params(&params, SORTABLE, DEFAULT_SORT);

    let (todos, total) = state
        .db
        .todos()
        .list_by_user(auth.user.id, &request)
        .await
        .db_err("Failed to list todos")?;

    let content: Vec<TodoResponse> = todos.into_iter().map(TodoResponse::from).collect();
    Ok(Json(Page::new(content, &request, total).with_keyword(&request)))
}

async fn create_todo(
    State(state): State<TodosState>,
    auth: Auth,
    JsonBody(payload): JsonBody<CreateTodoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = required(&payload.title, "title")?;
    max_length(title, "title", TITLE_MAX_LEN)?;

    let todo = state
        .db
        .todos()
        .create(auth.user.id, title)
        .await
        .db_err("Failed to create todo")?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/todos/{}", todo.id))],
        Json(TodoResponse::from(todo)),
    ))
}

async fn get_todo(
    State(state): State<TodosState>,
    auth: Auth,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    let todo = load_todo(&state.db, id, auth.user.id).await?;
    Ok(Json(TodoResponse::from(todo)))
}

async fn update_todo(
    State(state): State<TodosState>,
    auth: Auth,
    ResourceId(id): ResourceId,
    JsonBody(payload): JsonBody<UpdateTodoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    load_todo(&state.db, id, auth.user.id).await?;

    if payload.title.as_deref() == Some(MAINTENANCE_TITLE) {
        warn!(todo_id = id, "Maintenance title submitted");
        return Err(ApiError::service_unavailable(
            "Service is under maintenance, retry later",
        ));
    }

    let title = optional_non_blank(&payload.title, "title")?;
    if let Some(title) = title {
        max_length(title, "title", TITLE_MAX_LEN)?;
    }

    let todo = state
        .db
        .todos()
        .update(id, auth.user.id, title, payload.completed)
        .await
        .db_err("Failed to update todo")?
        .ok_or_else(todo_not_found)?;

    Ok(Json(TodoResponse::from(todo)))
}

async fn delete_todo(
    State(state): State<TodosState>,
    auth: Auth,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .todos()
        .delete(id, auth.user.id)
        .await
        .db_err("Failed to delete todo")?;

    if !deleted {
        return Err(todo_not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

//! Todo CRUD endpoints.
//!
//! All routes require authentication and operate only on the caller's own
//! rows; row ownership is enforced in the store queries themselves.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{CookieConfig, HasAuthState, RequireAuth};
use crate::db::{Database, Todo};
use crate::jwt::JwtConfig;

/// Longest accepted todo text, in characters.
const MAX_TEXT_CHARS: usize = 255;

/// Most todos accepted in a single bulk creation.
const MAX_BULK_ITEMS: usize = 100;

/// State for todo endpoints.
#[derive(Clone)]
pub struct TodosState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub cookie: Option<CookieConfig>,
}

impl HasAuthState for TodosState {
    fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }
    fn cookie_config(&self) -> Option<&CookieConfig> {
        self.cookie.as_ref()
    }
}

pub fn router(state: TodosState) -> Router {
    Router::new()
        .route("/", get(list_todos).post(create_todo))
        .route("/bulk", post(create_bulk_todos))
        .route("/{id}", put(update_todo).delete(delete_todo))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct CreateTodoRequest {
    text: String,
}

#[derive(Deserialize)]
struct CreateBulkTodosRequest {
    todos: Vec<CreateTodoRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTodoRequest {
    text: String,
    is_complete: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TodoResponse {
    id: i64,
    text: String,
    is_complete: bool,
    created_at: String,
    updated_at: String,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            text: todo.text,
            is_complete: todo.is_complete,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

#[derive(Serialize)]
struct TodoListResponse {
    todos: Vec<TodoResponse>,
}

// --- Helpers ---

fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.is_empty() || text.chars().count() > MAX_TEXT_CHARS {
        return Err(ApiError::bad_request(
            "invalid_request",
            "request body is invalid",
        ));
    }
    Ok(())
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|e| {
        tracing::warn!(error = %e, "Invalid request body");
        ApiError::bad_request("invalid_request", "request body is invalid")
    })
}

fn parse_todo_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    let Ok(Path(id)) = id else {
        return Err(ApiError::bad_request(
            "invalid_todo_id",
            "todo id must be a positive integer",
        ));
    };
    if id <= 0 {
        return Err(ApiError::bad_request(
            "invalid_todo_id",
            "todo id must be a positive integer",
        ));
    }
    Ok(id)
}

// --- Handlers ---

async fn list_todos(
    State(state): State<TodosState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let todos = state
        .db
        .todos()
        .list_by_user(user.user_id)
        .await
        .db_err("Failed to list todos")?;

    Ok(Json(TodoListResponse {
        todos: todos.into_iter().map(TodoResponse::from).collect(),
    }))
}

async fn create_todo(
    State(state): State<TodosState>,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = parse_body(payload)?;
    validate_text(&payload.text)?;

    let todo = state
        .db
        .todos()
        .create(user.user_id, &payload.text)
        .await
        .db_err("Failed to create todo")?;

    Ok((StatusCode::CREATED, Json(TodoResponse::from(todo))))
}

async fn create_bulk_todos(
    State(state): State<TodosState>,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<CreateBulkTodosRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = parse_body(payload)?;

    if payload.todos.is_empty() || payload.todos.len() > MAX_BULK_ITEMS {
        return Err(ApiError::bad_request(
            "invalid_request",
            "request body is invalid",
        ));
    }

    let mut texts = Vec::with_capacity(payload.todos.len());
    for todo in &payload.todos {
        validate_text(&todo.text)?;
        texts.push(todo.text.clone());
    }

    let todos = state
        .db
        .todos()
        .create_bulk(user.user_id, &texts)
        .await
        .db_err("Failed to create todos")?;

    Ok((
        StatusCode::CREATED,
        Json(TodoListResponse {
            todos: todos.into_iter().map(TodoResponse::from).collect(),
        }),
    ))
}

async fn update_todo(
    State(state): State<TodosState>,
    RequireAuth(user): RequireAuth,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_todo_id(id)?;
    let payload = parse_body(payload)?;
    validate_text(&payload.text)?;

    let todo = state
        .db
        .todos()
        .update(id, user.user_id, &payload.text, payload.is_complete)
        .await
        .db_err("Failed to update todo")?
        .ok_or_else(|| ApiError::not_found("todo_not_found", "Not Found"))?;

    Ok(Json(TodoResponse::from(todo)))
}

async fn delete_todo(
    State(state): State<TodosState>,
    RequireAuth(user): RequireAuth,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_todo_id(id)?;

    let deleted = state
        .db
        .todos()
        .delete(id, user.user_id)
        .await
        .db_err("Failed to delete todo")?;

    if !deleted {
        return Err(ApiError::not_found("todo_not_found", "Not Found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

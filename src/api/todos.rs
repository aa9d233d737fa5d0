//! Todo handlers.
//!
//! Every handler runs for the signed-in user only. Targeted operations match
//! on both the todo id and the user id; a todo that belongs to someone else
//! (or does not exist) is left alone and the caller's unchanged list comes
//! back. Each mutation answers with the caller's refreshed list.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
};

use super::dto::{
    CreateTodoRequest, ListTodosQuery, TodoListResponse, ToggleTodoRequest, UpdateTodoRequest,
    parse_todo_id,
};
use super::error::{ApiErrorResponse, ValidationError};
use super::handlers::AppState;
use super::session::AuthSession;
use crate::domain::{Timestamp, Todo, TodoId, TodoQuery, UserId};

// =============================================================================
// GET /todos
// =============================================================================

/// Lists the caller's todos.
///
/// # Query Parameters
///
/// - `search`: case-insensitive text match (default: none)
/// - `status`: `all` (default), `pending`, `done`
/// - `sort`: `newest` (default), `deadline`
///
/// # Errors
///
/// - **400 Bad Request**: unknown `status` or `sort`
/// - **401 Unauthorized**: no valid session
pub async fn list_todos(
    State(state): State<AppState>,
    session: AuthSession,
    query: Result<Query<ListTodosQuery>, QueryRejection>,
) -> Result<Json<TodoListResponse>, ApiErrorResponse> {
    let Query(query) = query?;
    let query = TodoQuery::from(query);

    let todos = state
        .todo_repository
        .list_for_user(session.user_id())
        .await?;

    let now = Timestamp::now();
    Ok(Json(TodoListResponse::from_todos(&query.apply(todos), &now)))
}

// =============================================================================
// POST /todos
// =============================================================================

/// Creates a pending todo.
///
/// # Request Body
///
/// ```json
/// { "text": "Buy milk", "deadline": "2024-08-01T09:00" }
/// ```
///
/// # Errors
///
/// - **400 Bad Request**: empty or overlong text, unparseable deadline
/// - **401 Unauthorized**: no valid session
pub async fn create_todo(
    State(state): State<AppState>,
    session: AuthSession,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TodoListResponse>), ApiErrorResponse> {
    let Json(request) = payload?;
    let validated = request.validate()?;

    let now = Timestamp::now();
    let todo = Todo::new(
        TodoId::generate(),
        *session.user_id(),
        validated.text,
        validated.deadline,
        now,
    );

    state.todo_repository.insert(&todo).await?;
    tracing::info!(todo_id = %todo.todo_id, user_id = %todo.user_id, "Created todo");

    let response = refreshed_list(&state, session.user_id()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// =============================================================================
// POST /todos/{id}/toggle
// =============================================================================

/// Flips a todo between pending and done.
///
/// The optional body names the status the client currently shows; without it
/// the stored status is flipped. Done todos get `finished_time` set to now,
/// pending todos have it cleared.
///
/// # Errors
///
/// - **400 Bad Request**: malformed id or body
/// - **401 Unauthorized**: no valid session
pub async fn toggle_todo(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TodoListResponse>, ApiErrorResponse> {
    let todo_id = parse_todo_id(&id)?;
    let request = parse_toggle_body(&body)?;

    if let Some(todo) = state
        .todo_repository
        .find_owned(&todo_id, session.user_id())
        .await?
    {
        let current_status = request.current_status.unwrap_or_else(|| todo.status());
        let toggled = todo.toggled(current_status, Timestamp::now());
        let updated = state.todo_repository.update_owned(&toggled).await?;
        log_targeted("toggle", &todo_id, session.user_id(), updated);
    } else {
        log_targeted("toggle", &todo_id, session.user_id(), false);
    }

    Ok(Json(refreshed_list(&state, session.user_id()).await?))
}

/// An empty body means "use the stored status".
fn parse_toggle_body(body: &[u8]) -> Result<ToggleTodoRequest, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ToggleTodoRequest::default());
    }
    serde_json::from_slice(body).map_err(|error| {
        ValidationError::single("current_status", format!("Invalid toggle request: {error}"))
    })
}

// =============================================================================
// PUT /todos/{id}
// =============================================================================

/// Replaces a todo's text, deadline and completion time.
///
/// The status follows `finished_time`: present means done, absent or empty
/// means pending.
///
/// # Errors
///
/// - **400 Bad Request**: malformed id, empty or overlong text, unparseable dates
/// - **401 Unauthorized**: no valid session
pub async fn update_todo(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<TodoListResponse>, ApiErrorResponse> {
    let todo_id = parse_todo_id(&id)?;
    let Json(request) = payload?;
    let validated = request.validate()?;

    let updated = match state
        .todo_repository
        .find_owned(&todo_id, session.user_id())
        .await?
    {
        Some(todo) => {
            let edited = todo.edited(validated.text, validated.deadline, validated.finished_time);
            state.todo_repository.update_owned(&edited).await?
        }
        None => false,
    };
    log_targeted("update", &todo_id, session.user_id(), updated);

    Ok(Json(refreshed_list(&state, session.user_id()).await?))
}

// =============================================================================
// DELETE /todos/{id}
// =============================================================================

/// Deletes a todo.
///
/// # Errors
///
/// - **400 Bad Request**: malformed id
/// - **401 Unauthorized**: no valid session
pub async fn delete_todo(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<TodoListResponse>, ApiErrorResponse> {
    let todo_id = parse_todo_id(&id)?;

    let deleted = state
        .todo_repository
        .delete_owned(&todo_id, session.user_id())
        .await?;
    log_targeted("delete", &todo_id, session.user_id(), deleted);

    Ok(Json(refreshed_list(&state, session.user_id()).await?))
}

// =============================================================================
// Helpers
// =============================================================================

/// Re-reads the caller's full list, newest first.
async fn refreshed_list(
    state: &AppState,
    user_id: &UserId,
) -> Result<TodoListResponse, ApiErrorResponse> {
    let todos = state.todo_repository.list_for_user(user_id).await?;
    Ok(TodoListResponse::from_todos(&todos, &Timestamp::now()))
}

fn log_targeted(operation: &'static str, todo_id: &TodoId, user_id: &UserId, affected: bool) {
    if affected {
        tracing::info!(operation, %todo_id, %user_id, "Todo changed");
    } else {
        tracing::debug!(operation, %todo_id, %user_id, "No owned todo matched");
    }
}

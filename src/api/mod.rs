//! API module for HTTP handlers.
//!
//! This module contains route definitions and request/response handlers.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod todos;

pub use auth::{
    AuthError, OAuthCallbackQuery, current_session, google_callback, google_redirect, register,
    sign_in, sign_out,
};
pub use dto::{
    CreateTodoRequest, ListTodosQuery, RegisterRequest, SignInRequest, SignInResponse,
    TodoListResponse, TodoResponse, ToggleTodoRequest, UpdateTodoRequest, UserResponse,
};
pub use error::{ApiError, ApiErrorResponse, FieldError, ValidationError};
pub use handlers::{AppState, HealthResponse, health_check};
pub use routes::create_router;
pub use session::{AuthSession, OAUTH_STATE_COOKIE, SESSION_COOKIE};
pub use todos::{create_todo, delete_todo, list_todos, toggle_todo, update_todo};

//! Data Transfer Objects for API requests and responses.
//!
//! Request DTOs accept raw strings so that validation can report every bad
//! field at once; each has a `validate` method producing checked values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FieldError, ValidationError};
use crate::domain::{
    SortOrder, StatusFilter, Timestamp, Todo, TodoId, TodoQuery, TodoStatus, User,
    datetime_input, normalize_email,
};

/// Maximum todo text length in characters.
pub const MAX_TEXT_LENGTH: usize = 500;

/// Maximum display name length in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum email length in bytes.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum password length in bytes.
pub const MAX_PASSWORD_LENGTH: usize = 1024;

// =============================================================================
// Todo Requests
// =============================================================================

/// Request DTO for creating a todo.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTodoRequest {
    /// What needs doing.
    #[serde(default)]
    pub text: String,
    /// Optional deadline, RFC 3339 or `YYYY-MM-DDTHH:MM`.
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Validated create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCreateTodo {
    /// Trimmed text.
    pub text: String,
    /// Parsed deadline.
    pub deadline: Option<Timestamp>,
}

impl CreateTodoRequest {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` listing every invalid field.
    pub fn validate(&self) -> Result<ValidatedCreateTodo, ValidationError> {
        let mut errors = Vec::new();
        let text = collect(validate_text(&self.text), &mut errors);
        let deadline = collect(
            validate_datetime("deadline", self.deadline.as_deref()),
            &mut errors,
        );
        match (text, deadline) {
            (Some(text), Some(deadline)) if errors.is_empty() => {
                Ok(ValidatedCreateTodo { text, deadline })
            }
            _ => Err(ValidationError::new(errors)),
        }
    }
}

/// Request DTO for toggling a todo's status.
///
/// The body is optional; without `current_status` the stored status is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToggleTodoRequest {
    /// Status the client currently shows for the todo.
    #[serde(default)]
    pub current_status: Option<TodoStatus>,
}

/// Request DTO for editing a todo.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTodoRequest {
    /// New text.
    #[serde(default)]
    pub text: String,
    /// New deadline; absent or empty clears it.
    #[serde(default)]
    pub deadline: Option<String>,
    /// New completion time; absent or empty marks the todo pending.
    #[serde(default)]
    pub finished_time: Option<String>,
}

/// Validated update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpdateTodo {
    /// Trimmed text.
    pub text: String,
    /// Parsed deadline.
    pub deadline: Option<Timestamp>,
    /// Parsed completion time.
    pub finished_time: Option<Timestamp>,
}

impl UpdateTodoRequest {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` listing every invalid field.
    pub fn validate(&self) -> Result<ValidatedUpdateTodo, ValidationError> {
        let mut errors = Vec::new();
        let text = collect(validate_text(&self.text), &mut errors);
        let deadline = collect(
            validate_datetime("deadline", self.deadline.as_deref()),
            &mut errors,
        );
        let finished_time = collect(
            validate_datetime("finished_time", self.finished_time.as_deref()),
            &mut errors,
        );
        match (text, deadline, finished_time) {
            (Some(text), Some(deadline), Some(finished_time)) if errors.is_empty() => {
                Ok(ValidatedUpdateTodo {
                    text,
                    deadline,
                    finished_time,
                })
            }
            _ => Err(ValidationError::new(errors)),
        }
    }
}

/// Query parameters for listing todos.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTodosQuery {
    /// Case-insensitive text search.
    #[serde(default)]
    pub search: Option<String>,
    /// `all` (default), `pending` or `done`.
    #[serde(default)]
    pub status: Option<StatusFilter>,
    /// `newest` (default) or `deadline`.
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

impl From<ListTodosQuery> for TodoQuery {
    fn from(query: ListTodosQuery) -> Self {
        Self {
            search: query.search.unwrap_or_default(),
            status: query.status.unwrap_or_default(),
            sort: query.sort.unwrap_or_default(),
        }
    }
}

// =============================================================================
// Todo Responses
// =============================================================================

/// Response DTO for a todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoResponse {
    /// Todo ID.
    pub id: String,
    /// What needs doing.
    pub text: String,
    /// `pending` or `done`.
    pub status: TodoStatus,
    /// Deadline, RFC 3339.
    pub deadline: Option<DateTime<Utc>>,
    /// Completion time, RFC 3339; present exactly when `status` is `done`.
    pub finished_time: Option<DateTime<Utc>>,
    /// Creation time, RFC 3339.
    pub created_at: DateTime<Utc>,
    /// Deadline passed and not done.
    pub overdue: bool,
    /// Deadline in edit-form shape (`YYYY-MM-DDTHH:MM`), or `""`.
    pub deadline_input: String,
    /// Completion time in edit-form shape, or `""`.
    pub finished_time_input: String,
}

impl TodoResponse {
    /// Builds a response for `todo` as seen at `now`.
    #[must_use]
    pub fn from_todo(todo: &Todo, now: &Timestamp) -> Self {
        Self {
            id: todo.todo_id.to_string(),
            text: todo.text.clone(),
            status: todo.status(),
            deadline: todo.deadline.map(|deadline| *deadline.as_datetime()),
            finished_time: todo.finished_time().map(|finished| *finished.as_datetime()),
            created_at: *todo.created_at.as_datetime(),
            overdue: todo.is_overdue(now),
            deadline_input: datetime_input::format(todo.deadline.as_ref()),
            finished_time_input: datetime_input::format(todo.finished_time()),
        }
    }
}

/// Response DTO carrying a user's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoListResponse {
    /// Todos in the requested order.
    pub todos: Vec<TodoResponse>,
}

impl TodoListResponse {
    /// Builds a list response as seen at `now`.
    #[must_use]
    pub fn from_todos(todos: &[Todo], now: &Timestamp) -> Self {
        Self {
            todos: todos
                .iter()
                .map(|todo| TodoResponse::from_todo(todo, now))
                .collect(),
        }
    }
}

// =============================================================================
// Auth DTOs
// =============================================================================

/// Request DTO for registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Plain-text password.
    #[serde(default)]
    pub password: String,
}

/// Validated registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRegistration {
    /// Trimmed display name.
    pub name: Option<String>,
    /// Normalized email.
    pub email: String,
    /// Password as given.
    pub password: String,
}

impl RegisterRequest {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` listing every invalid field.
    pub fn validate(&self) -> Result<ValidatedRegistration, ValidationError> {
        let mut errors = Vec::new();
        let name = collect(validate_name(self.name.as_deref()), &mut errors);
        let email = collect(validate_email(&self.email), &mut errors);
        let password = collect(validate_password(&self.password), &mut errors);
        match (name, email, password) {
            (Some(name), Some(email), Some(password)) if errors.is_empty() => {
                Ok(ValidatedRegistration {
                    name,
                    email,
                    password,
                })
            }
            _ => Err(ValidationError::new(errors)),
        }
    }
}

/// Request DTO for credentials sign-in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInRequest {
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Plain-text password.
    #[serde(default)]
    pub password: String,
}

impl SignInRequest {
    /// Validates the request, returning the normalized email and password.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if either field is missing.
    pub fn validate(&self) -> Result<(String, String), ValidationError> {
        let mut errors = Vec::new();
        let email = normalize_email(&self.email);
        if email.is_empty() {
            errors.push(FieldError::new("email", "Email is required"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        if errors.is_empty() {
            Ok((email, self.password.clone()))
        } else {
            Err(ValidationError::new(errors))
        }
    }
}

/// Public user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    /// User ID.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: String,
    /// Avatar URL.
    pub image: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.user_id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
        }
    }
}

/// Response DTO for a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInResponse {
    /// Session token, also set as the `session` cookie.
    pub token: String,
    /// Signed-in user.
    pub user: UserResponse,
}

// =============================================================================
// Validation Functions
// =============================================================================

fn collect<T>(result: Result<T, ValidationError>, errors: &mut Vec<FieldError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            errors.extend(error.errors);
            None
        }
    }
}

/// Validates todo text.
///
/// # Validation Rules
///
/// - Text is trimmed and must not be empty
/// - Text must not exceed [`MAX_TEXT_LENGTH`] characters
///
/// # Errors
///
/// Returns a `ValidationError` on the `text` field.
pub fn validate_text(text: &str) -> Result<String, ValidationError> {
    let text = text.trim();

    if text.is_empty() {
        return Err(ValidationError::single("text", "Text is required"));
    }

    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ValidationError::single(
            "text",
            format!("Text must not exceed {MAX_TEXT_LENGTH} characters"),
        ));
    }

    Ok(text.to_string())
}

/// Parses an optional date-time field.
///
/// # Errors
///
/// Returns a `ValidationError` on `field` if the value cannot be parsed.
pub fn validate_datetime(
    field: &str,
    value: Option<&str>,
) -> Result<Option<Timestamp>, ValidationError> {
    datetime_input::parse_optional(value)
        .map_err(|error| ValidationError::single(field, error.to_string()))
}

/// Validates and normalizes an email address.
///
/// # Errors
///
/// Returns a `ValidationError` on the `email` field.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = normalize_email(email);

    if email.is_empty() {
        return Err(ValidationError::single("email", "Email is required"));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::single(
            "email",
            format!("Email must not exceed {MAX_EMAIL_LENGTH} characters"),
        ));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::single("email", "Email is not valid")),
    }
}

/// Validates a new password.
///
/// # Errors
///
/// Returns a `ValidationError` on the `password` field.
pub fn validate_password(password: &str) -> Result<String, ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::single("password", "Password is required"));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::single(
            "password",
            format!("Password must not exceed {MAX_PASSWORD_LENGTH} bytes"),
        ));
    }

    Ok(password.to_string())
}

/// Validates an optional display name; blank means absent.
///
/// # Errors
///
/// Returns a `ValidationError` on the `name` field if it is too long.
pub fn validate_name(name: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
        return Ok(None);
    };

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::single(
            "name",
            format!("Name must not exceed {MAX_NAME_LENGTH} characters"),
        ));
    }

    Ok(Some(name.to_string()))
}

/// Parses a todo id from a path segment.
///
/// # Errors
///
/// Returns a `ValidationError` on the `id` field if it is not a UUID.
pub fn parse_todo_id(value: &str) -> Result<TodoId, ValidationError> {
    value
        .parse()
        .map_err(|_| ValidationError::single("id", format!("Invalid todo id: '{value}'")))
}

// =============================================================================
// Tests
// =============================================================================

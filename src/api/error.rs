//! API error handling.
//!
//! This module provides error types and response formatting for the API.
//! Lower-layer errors convert into [`ApiErrorResponse`] via `From`; anything
//! that would leak internals is logged and replaced by an opaque 500.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::infrastructure::{IdentityProviderError, PasswordError, RepositoryError, SessionError};

// =============================================================================
// API Error
// =============================================================================

/// API error structure for JSON responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional field-level errors for validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    /// Creates a new API error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a validation error with field-level details.
    #[must_use]
    pub fn validation(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            code: "VALIDATION_ERROR".to_string(),
            message: message.into(),
            details: Some(details),
        }
    }
}

/// Field-level error for validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the field that failed validation.
    pub field: String,
    /// Error message for this field.
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// API Error Response
// =============================================================================

/// API error response containing status code and error details.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Error details.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// Creates a new API error response.
    #[must_use]
    pub const fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }

    /// Creates a 400 Bad Request response.
    #[must_use]
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiError::new(code, message))
    }

    /// Creates a 400 Bad Request response for validation errors.
    #[must_use]
    pub fn validation_error(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ApiError::validation(message, details),
        )
    }

    /// Creates a 401 Unauthorized response.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ApiError::new("UNAUTHORIZED", message),
        )
    }

    /// Creates a 404 Not Found response.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", message))
    }

    /// Creates a 409 Conflict response.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, ApiError::new("CONFLICT", message))
    }

    /// Creates a 503 Service Unavailable response.
    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ApiError::new("SERVICE_UNAVAILABLE", message),
        )
    }

    /// Creates a 500 Internal Server Error response.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new("INTERNAL_ERROR", message),
        )
    }

    /// Logs `error` and returns an opaque 500.
    #[must_use]
    pub fn internal(error: &impl std::fmt::Display) -> Self {
        tracing::error!(%error, "Internal error");
        Self::internal_error("An internal error occurred")
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<RepositoryError> for ApiErrorResponse {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(message) => Self::not_found(message),
            RepositoryError::Conflict(message) => Self::conflict(message),
            RepositoryError::DatabaseError(_) => Self::internal(&error),
        }
    }
}

impl From<SessionError> for ApiErrorResponse {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Expired => Self::unauthorized("Session expired"),
            SessionError::Invalid(_) => Self::unauthorized("Invalid session"),
            SessionError::Signing(_) => Self::internal(&error),
        }
    }
}

impl From<PasswordError> for ApiErrorResponse {
    fn from(error: PasswordError) -> Self {
        Self::internal(&error)
    }
}

impl From<IdentityProviderError> for ApiErrorResponse {
    fn from(error: IdentityProviderError) -> Self {
        match error {
            IdentityProviderError::Rejected(_) => {
                tracing::warn!(%error, "Identity provider rejected authorization code");
                Self::bad_request("OAUTH_ERROR", "Sign-in with the identity provider failed")
            }
            IdentityProviderError::MissingEmail => {
                Self::bad_request("OAUTH_ERROR", error.to_string())
            }
            IdentityProviderError::Unavailable(_) => {
                tracing::error!(%error, "Identity provider unavailable");
                Self::service_unavailable("Identity provider is unavailable")
            }
        }
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            rejection.status(),
            ApiError::new("INVALID_REQUEST", rejection.body_text()),
        )
    }
}

impl From<QueryRejection> for ApiErrorResponse {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("INVALID_QUERY", rejection.body_text())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Validation error type for request validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field-level errors.
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub const fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Creates a validation error with a single field error.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldError::new(field, message)])
    }

    /// Returns true if there are no validation errors.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<ValidationError> for ApiErrorResponse {
    fn from(error: ValidationError) -> Self {
        Self::validation_error("Validation failed", error.errors)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_api_error_validation() {
        let details = vec![FieldError::new("text", "Text is required")];
        let error = ApiError::validation("Validation failed", details);
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert_eq!(error.details.map(|details| details.len()), Some(1));
    }

    #[rstest]
    fn test_api_error_skips_empty_details() {
        let json = serde_json::to_value(ApiError::new("NOT_FOUND", "gone")).unwrap();
        assert!(json.get("details").is_none());
    }

    #[rstest]
    #[case(ApiErrorResponse::unauthorized("x"), StatusCode::UNAUTHORIZED, "UNAUTHORIZED")]
    #[case(ApiErrorResponse::not_found("x"), StatusCode::NOT_FOUND, "NOT_FOUND")]
    #[case(ApiErrorResponse::conflict("x"), StatusCode::CONFLICT, "CONFLICT")]
    #[case(
        ApiErrorResponse::service_unavailable("x"),
        StatusCode::SERVICE_UNAVAILABLE,
        "SERVICE_UNAVAILABLE"
    )]
    #[case(
        ApiErrorResponse::internal_error("x"),
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR"
    )]
    fn test_api_error_response_constructors(
        #[case] response: ApiErrorResponse,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        assert_eq!(response.status, status);
        assert_eq!(response.error.code, code);
    }

    #[rstest]
    #[case(RepositoryError::NotFound("todo".to_string()), StatusCode::NOT_FOUND)]
    #[case(RepositoryError::Conflict("email".to_string()), StatusCode::CONFLICT)]
    #[case(RepositoryError::DatabaseError("down".to_string()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_repository_error_to_api_error_response(
        #[case] error: RepositoryError,
        #[case] expected: StatusCode,
    ) {
        let response = ApiErrorResponse::from(error);
        assert_eq!(response.status, expected);
    }

    #[rstest]
    fn test_database_error_details_are_hidden() {
        let response =
            ApiErrorResponse::from(RepositoryError::DatabaseError("password=hunter2".to_string()));
        assert!(!response.error.message.contains("hunter2"));
    }

    #[rstest]
    #[case(SessionError::Expired, StatusCode::UNAUTHORIZED)]
    #[case(SessionError::Invalid("bad".to_string()), StatusCode::UNAUTHORIZED)]
    #[case(SessionError::Signing("bad".to_string()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_session_error_to_api_error_response(
        #[case] error: SessionError,
        #[case] expected: StatusCode,
    ) {
        assert_eq!(ApiErrorResponse::from(error).status, expected);
    }

    #[rstest]
    #[case(IdentityProviderError::Rejected("bad".to_string()), StatusCode::BAD_REQUEST)]
    #[case(IdentityProviderError::MissingEmail, StatusCode::BAD_REQUEST)]
    #[case(IdentityProviderError::Unavailable("down".to_string()), StatusCode::SERVICE_UNAVAILABLE)]
    fn test_identity_provider_error_to_api_error_response(
        #[case] error: IdentityProviderError,
        #[case] expected: StatusCode,
    ) {
        assert_eq!(ApiErrorResponse::from(error).status, expected);
    }

    #[rstest]
    fn test_validation_error_to_api_error_response() {
        let error = ValidationError::single("text", "Text is required");
        let response: ApiErrorResponse = error.into();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error.code, "VALIDATION_ERROR");
    }
}

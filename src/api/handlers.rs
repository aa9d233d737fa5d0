//! Shared application state and the health check.

use std::sync::Arc;

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infrastructure::{
    AuthConfig, IdentityProvider, Repositories, SessionKeys, TodoRepository, UserRepository,
};

// =============================================================================
// Application State
// =============================================================================

/// Shared application dependencies.
///
/// Uses trait objects so the storage backend and the identity provider can be
/// selected at runtime.
#[derive(Clone)]
pub struct AppState {
    /// Todo repository.
    pub todo_repository: Arc<dyn TodoRepository + Send + Sync>,
    /// User repository.
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    /// Session token keys.
    pub session_keys: Arc<SessionKeys>,
    /// Google (or stub) provider; `None` disables OAuth sign-in.
    pub identity_provider: Option<Arc<dyn IdentityProvider>>,
    /// Whether cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
}

impl AppState {
    /// Creates a new `AppState` from initialized repositories and auth settings.
    ///
    /// OAuth stays disabled until [`AppState::with_identity_provider`] is called.
    #[must_use]
    pub fn from_repositories(repositories: Repositories, auth: &AuthConfig) -> Self {
        Self {
            todo_repository: repositories.todo_repository,
            user_repository: repositories.user_repository,
            session_keys: Arc::new(SessionKeys::new(
                auth.secret.as_bytes(),
                auth.session_ttl_seconds,
            )),
            identity_provider: None,
            secure_cookies: auth.secure_cookies(),
        }
    }

    /// Enables OAuth sign-in through `provider`.
    #[must_use]
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity_provider = Some(provider);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppState")
            .field("session_keys", &self.session_keys)
            .field("oauth_enabled", &self.identity_provider.is_some())
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// API version.
    pub version: String,
}

/// Health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

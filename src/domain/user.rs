//! User and linked-account domain models.

use super::value_objects::{Timestamp, UserId};

/// A registered user.
///
/// Users created through an OAuth provider have no password hash and can
/// only sign in through that provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique identifier.
    pub user_id: UserId,
    /// Display name.
    pub name: Option<String>,
    /// Normalized (trimmed, lowercase) email address, unique per user.
    pub email: String,
    /// Argon2 PHC string, absent for OAuth-only users.
    pub password_hash: Option<String>,
    /// Avatar URL.
    pub image: Option<String>,
    /// When the user registered.
    pub created_at: Timestamp,
}

impl User {
    /// Creates a user with the given identity and no password or avatar.
    #[must_use]
    pub fn new(user_id: UserId, email: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            user_id,
            name: None,
            email: normalize_email(&email.into()),
            password_hash: None,
            image: None,
            created_at,
        }
    }

    /// Returns a copy with the given display name.
    #[must_use]
    pub fn with_name(self, name: Option<String>) -> Self {
        Self { name, ..self }
    }

    /// Returns a copy with the given password hash.
    #[must_use]
    pub fn with_password_hash(self, password_hash: impl Into<String>) -> Self {
        Self {
            password_hash: Some(password_hash.into()),
            ..self
        }
    }

    /// Returns a copy with the given avatar URL.
    #[must_use]
    pub fn with_image(self, image: Option<String>) -> Self {
        Self { image, ..self }
    }

    /// Returns `true` if the user can sign in with a password.
    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Link between a local user and an external identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountLink {
    /// Local user.
    pub user_id: UserId,
    /// Provider name, e.g. `google`.
    pub provider: String,
    /// Subject identifier issued by the provider.
    pub provider_account_id: String,
}

impl AccountLink {
    /// Creates a new account link.
    #[must_use]
    pub fn new(
        user_id: UserId,
        provider: impl Into<String>,
        provider_account_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            provider: provider.into(),
            provider_account_id: provider_account_id.into(),
        }
    }
}

/// Trims and lowercases an email address so lookups are case-insensitive.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

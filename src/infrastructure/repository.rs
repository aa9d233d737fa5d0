//! Repository traits for domain entities.
//!
//! Methods return boxed `'static` futures so that backends can be stored as
//! `Arc<dyn Trait + Send + Sync>` and chosen at runtime. Arguments are cloned
//! into the future before it is returned.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::{AccountLink, Todo, TodoId, User, UserId};

// =============================================================================
// Repository Error
// =============================================================================

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Entity was not found.
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Result of a repository call, boxed for use behind `dyn`.
pub type RepositoryFuture<T> = BoxFuture<'static, Result<T, RepositoryError>>;

// =============================================================================
// Todo Repository
// =============================================================================

/// Repository trait for Todo entities.
///
/// Every targeted operation matches on both the todo id and the owning user
/// id. A todo owned by someone else behaves exactly like a missing one.
pub trait TodoRepository: Send + Sync {
    /// Finds a todo by id, only if `owner` owns it.
    fn find_owned(&self, id: &TodoId, owner: &UserId) -> RepositoryFuture<Option<Todo>>;

    /// Lists all todos of `owner`, newest first.
    fn list_for_user(&self, owner: &UserId) -> RepositoryFuture<Vec<Todo>>;

    /// Inserts a new todo.
    fn insert(&self, todo: &Todo) -> RepositoryFuture<()>;

    /// Overwrites text, status, deadline and finished time of a todo whose id
    /// and owner both match `todo`.
    ///
    /// Returns `Ok(false)` when no row matched.
    fn update_owned(&self, todo: &Todo) -> RepositoryFuture<bool>;

    /// Deletes a todo whose id and owner both match.
    ///
    /// Returns `Ok(false)` when no row matched.
    fn delete_owned(&self, id: &TodoId, owner: &UserId) -> RepositoryFuture<bool>;
}

// =============================================================================
// User Repository
// =============================================================================

/// Repository trait for users and their linked external accounts.
pub trait UserRepository: Send + Sync {
    /// Finds a user by id.
    fn find_by_id(&self, id: &UserId) -> RepositoryFuture<Option<User>>;

    /// Finds a user by (already normalized) email.
    fn find_by_email(&self, email: &str) -> RepositoryFuture<Option<User>>;

    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Resolves to `RepositoryError::Conflict` if the email is taken.
    fn insert(&self, user: &User) -> RepositoryFuture<()>;

    /// Finds the user linked to an external account.
    fn find_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> RepositoryFuture<Option<User>>;

    /// Links an external account to a user.
    ///
    /// # Errors
    ///
    /// Resolves to `RepositoryError::Conflict` if the external account is
    /// already linked, or `RepositoryError::NotFound` if the user is missing.
    fn link_account(&self, link: &AccountLink) -> RepositoryFuture<()>;

    /// Inserts a new user together with its first linked account.
    ///
    /// Either both records are stored or neither is.
    ///
    /// # Errors
    ///
    /// Resolves to `RepositoryError::Conflict` if the email, the user id or
    /// the external account is taken.
    fn insert_with_account(&self, user: &User, link: &AccountLink) -> RepositoryFuture<()>;
}

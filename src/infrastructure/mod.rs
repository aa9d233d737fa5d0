//! Infrastructure module for external services.
//!
//! This module contains repositories, configuration, credential hashing,
//! session tokens, and the OAuth identity provider.

pub mod config;
pub mod factory;
pub mod in_memory;
pub mod oauth;
pub mod password;
pub mod postgres;
pub mod repository;
pub mod session;

pub use config::{AppConfig, AuthConfig, ConfigurationError, GoogleCredentials, LogFormat};
pub use factory::{
    FactoryError, Repositories, RepositoryConfig, RepositoryConfigBuilder, RepositoryFactory,
    StorageMode,
};
pub use in_memory::{InMemoryTodoRepository, InMemoryUserRepository};
pub use oauth::{
    ExternalIdentity, GoogleIdentityProvider, IdentityProvider, IdentityProviderError,
    StubIdentityProvider, generate_state,
};
pub use password::{PasswordError, hash_password, verify_password};
pub use postgres::{PostgresTodoRepository, PostgresUserRepository};
pub use repository::{RepositoryError, RepositoryFuture, TodoRepository, UserRepository};
pub use session::{Claims, SessionError, SessionKeys};

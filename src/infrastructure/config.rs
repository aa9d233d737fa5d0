//! Application configuration management.
//!
//! Configuration is read once at startup from environment variables (a
//! `.env` file is honored). Loading goes through a lookup function so that
//! tests can supply values without touching the process environment.
//!
//! # Environment Variables
//!
//! - `HOST` / `PORT`: bind address (default `0.0.0.0:3000`)
//! - `STORAGE_MODE` / `DATABASE_URL`: see [`RepositoryConfig`]
//! - `AUTH_SECRET`: session signing key, at least 32 bytes (required)
//! - `SESSION_TTL_SECONDS`: session lifetime (default 30 days)
//! - `AUTH_URL`: public base URL (default `http://localhost:3000`)
//! - `AUTH_GOOGLE_ID` / `AUTH_GOOGLE_SECRET`: enable Google sign-in
//! - `LOG_FORMAT`: `text` (default) or `json`

use std::str::FromStr;

use thiserror::Error;
use url::Url;

use super::factory::RepositoryConfig;

/// Minimum length of `AUTH_SECRET` in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default session lifetime: 30 days.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_AUTH_URL: &str = "http://localhost:3000";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Invalid storage mode value.
    #[error("Invalid storage mode: '{0}'. Expected 'in_memory' or 'postgres'")]
    InvalidStorageMode(String),

    /// `DATABASE_URL` missing when `PostgreSQL` is selected.
    #[error("DATABASE_URL environment variable is required when STORAGE_MODE=postgres")]
    MissingDatabaseUrl,

    /// A required variable is not set.
    #[error("{0} environment variable is required")]
    MissingVariable(String),

    /// A variable has a value that cannot be used.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// Reads `key` through `lookup`, trimmed, treating blank values as unset.
pub(crate) fn optional_trimmed(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigurationError> {
    optional_trimmed(lookup, key).ok_or_else(|| ConfigurationError::MissingVariable(key.to_string()))
}

fn parsed_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigurationError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_trimmed(lookup, key).map_or(Ok(default), |value| {
        value.parse().map_err(|error: T::Err| ConfigurationError::InvalidValue {
            key: key.to_string(),
            message: error.to_string(),
        })
    })
}

// =============================================================================
// Log Format
// =============================================================================

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigurationError::InvalidValue {
                key: "LOG_FORMAT".to_string(),
                message: format!("'{value}'. Expected 'text' or 'json'"),
            }),
        }
    }
}

impl LogFormat {
    /// Reads `LOG_FORMAT` from the environment, reading `.env` first if
    /// present.
    ///
    /// Logging starts before the rest of the configuration is loaded, so
    /// this is available on its own.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidValue` for an unknown format.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigurationError> {
        optional_trimmed(lookup, "LOG_FORMAT").map_or(Ok(Self::default()), |value| value.parse())
    }
}

// =============================================================================
// Auth Configuration
// =============================================================================

/// OAuth client credentials for Google.
#[derive(Clone, PartialEq, Eq)]
pub struct GoogleCredentials {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

impl std::fmt::Debug for GoogleCredentials {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("GoogleCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Authentication settings.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Session signing key.
    pub secret: String,
    /// Session lifetime in seconds.
    pub session_ttl_seconds: u64,
    /// Public base URL of this service, used for OAuth redirects.
    pub base_url: Url,
    /// Google credentials, `None` when Google sign-in is disabled.
    pub google: Option<GoogleCredentials>,
}

impl AuthConfig {
    /// Creates settings with the given secret and default values otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidValue` if the secret is shorter
    /// than [`MIN_SECRET_LENGTH`] bytes.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigurationError> {
        let secret = secret.into();
        validate_secret(&secret)?;
        let base_url = Url::parse(DEFAULT_AUTH_URL).map_err(|error| invalid("AUTH_URL", &error))?;
        Ok(Self {
            secret,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            base_url,
            google: None,
        })
    }

    /// Returns a copy with the given Google credentials.
    #[must_use]
    pub fn with_google(self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            google: Some(GoogleCredentials {
                client_id: client_id.into(),
                client_secret: client_secret.into(),
            }),
            ..self
        }
    }

    /// Returns a copy with the given public base URL.
    #[must_use]
    pub fn with_base_url(self, base_url: Url) -> Self {
        Self { base_url, ..self }
    }

    /// Returns `true` if cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.scheme() == "https"
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigurationError> {
        let secret = required(lookup, "AUTH_SECRET")?;
        validate_secret(&secret)?;

        let session_ttl_seconds =
            parsed_or(lookup, "SESSION_TTL_SECONDS", DEFAULT_SESSION_TTL_SECONDS)?;
        if session_ttl_seconds == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "SESSION_TTL_SECONDS".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        let base_url = optional_trimmed(lookup, "AUTH_URL")
            .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());
        let base_url = Url::parse(&base_url).map_err(|error| invalid("AUTH_URL", &error))?;

        let google = match (
            optional_trimmed(lookup, "AUTH_GOOGLE_ID"),
            optional_trimmed(lookup, "AUTH_GOOGLE_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(GoogleCredentials {
                client_id,
                client_secret,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigurationError::MissingVariable(
                    "AUTH_GOOGLE_SECRET".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(ConfigurationError::MissingVariable("AUTH_GOOGLE_ID".to_string()));
            }
        };

        Ok(Self {
            secret,
            session_ttl_seconds,
            base_url,
            google,
        })
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("base_url", &self.base_url.as_str())
            .field("google", &self.google)
            .finish()
    }
}

fn validate_secret(secret: &str) -> Result<(), ConfigurationError> {
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(ConfigurationError::InvalidValue {
            key: "AUTH_SECRET".to_string(),
            message: format!("must be at least {MIN_SECRET_LENGTH} bytes"),
        });
    }
    Ok(())
}

fn invalid(key: &str, error: &impl std::fmt::Display) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        key: key.to_string(),
        message: error.to_string(),
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// HTTP server host address.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    /// Storage backend settings.
    pub repository: RepositoryConfig,
    /// Authentication settings.
    pub auth: AuthConfig,
    /// Log output format.
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Loads configuration from environment variables, reading `.env` first
    /// if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a required variable is missing or a
    /// value is invalid.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a required variable is missing or a
    /// value is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigurationError> {
        let host = optional_trimmed(&lookup, "HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parsed_or(&lookup, "PORT", DEFAULT_PORT)?;
        let repository = RepositoryConfig::from_lookup(&lookup)?;
        let auth = AuthConfig::from_lookup(&lookup)?;
        let log_format = LogFormat::from_lookup(&lookup)?;

        Ok(Self {
            host,
            port,
            repository,
            auth,
            log_format,
        })
    }

    /// Returns the `host:port` address to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

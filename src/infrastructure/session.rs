//! Stateless session tokens.
//!
//! A session is an HS256 JWT whose `sub` claim is the user id. Nothing is
//! stored server-side; signing out only discards the client's copy.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::UserId;

/// Upper bound on the session lifetime: 10 years.
const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Errors from issuing or verifying a session token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The token has expired.
    #[error("Session expired")]
    Expired,

    /// The token is malformed, badly signed, or names no valid user id.
    #[error("Invalid session token: {0}")]
    Invalid(String),

    /// The token could not be signed.
    #[error("Failed to issue session token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(error.to_string()),
        }
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Issued at (seconds since the epoch).
    pub iat: i64,
    /// Expires at (seconds since the epoch).
    pub exp: i64,
}

/// Signing and verification keys plus the session lifetime.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionKeys {
    /// Creates keys from a shared secret.
    #[must_use]
    pub fn new(secret: &[u8], ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::seconds(
                i64::try_from(ttl_seconds.min(MAX_TTL_SECONDS)).unwrap_or(i64::MAX),
            ),
        }
    }

    /// Session lifetime in whole seconds.
    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issues a token for `user_id`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Signing` if encoding fails.
    pub fn issue(&self, user_id: &UserId) -> Result<String, SessionError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issues a token for `user_id` as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Signing` if encoding fails.
    pub fn issue_at(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<String, SessionError> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|error| SessionError::Signing(error.to_string()))
    }

    /// Verifies a token and returns the user id it names.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Expired` or `SessionError::Invalid`.
    pub fn verify(&self, token: &str) -> Result<UserId, SessionError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        data.claims
            .sub
            .parse()
            .map_err(|error: uuid::Error| SessionError::Invalid(error.to_string()))
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SessionKeys")
            .field("ttl_seconds", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

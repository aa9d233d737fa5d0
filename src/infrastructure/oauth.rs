//! External identity providers (OAuth 2.0 authorization code flow).
//!
//! The HTTP handlers only see the [`IdentityProvider`] trait. Google is the
//! production implementation; [`StubIdentityProvider`] returns a fixed
//! identity without network I/O.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use rand::distr::{Alphanumeric, SampleString};
use serde::Deserialize;
use thiserror::Error;
use url::{Url, form_urlencoded};

use super::config::GoogleCredentials;

const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GOOGLE_SCOPES: &str = "openid email profile";

/// Length of the random `state` parameter.
const STATE_LENGTH: usize = 32;

/// Default timeout for provider requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Error and Identity Types
// =============================================================================

/// Errors from talking to an identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityProviderError {
    /// The provider rejected the authorization code.
    #[error("Authorization code rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or answered unexpectedly.
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    /// The provider returned an identity without an email address.
    #[error("Identity provider returned no email address")]
    MissingEmail,
}

/// An identity asserted by an external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Stable subject identifier at the provider.
    pub subject: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub image: Option<String>,
}

/// An OAuth identity provider.
pub trait IdentityProvider: Send + Sync {
    /// Provider name stored in account links, e.g. `google`.
    fn provider_name(&self) -> &'static str;

    /// URL to send the user's browser to, carrying `state`.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchanges an authorization code for the user's identity.
    fn exchange_code(
        &self,
        code: &str,
    ) -> BoxFuture<'static, Result<ExternalIdentity, IdentityProviderError>>;
}

/// Generates a random `state` value for an authorization request.
#[must_use]
pub fn generate_state() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), STATE_LENGTH)
}

// =============================================================================
// Google
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Google OAuth 2.0 / OpenID Connect provider.
#[derive(Clone)]
pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    credentials: GoogleCredentials,
    redirect_uri: String,
}

impl GoogleIdentityProvider {
    /// Creates a provider whose callback lives under `base_url`.
    #[must_use]
    pub fn new(credentials: GoogleCredentials, base_url: &Url) -> Self {
        let redirect_uri = format!(
            "{}/auth/google/callback",
            base_url.as_str().trim_end_matches('/')
        );
        Self {
            client: reqwest::Client::new(),
            credentials,
            redirect_uri,
        }
    }

    /// Callback URL registered with Google.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

impl std::fmt::Debug for GoogleIdentityProvider {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("GoogleIdentityProvider")
            .field("credentials", &self.credentials)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

fn map_request_error(error: &reqwest::Error) -> IdentityProviderError {
    if error.is_timeout() {
        IdentityProviderError::Unavailable(format!("timeout after {}s", REQUEST_TIMEOUT.as_secs()))
    } else {
        IdentityProviderError::Unavailable(error.to_string())
    }
}

async fn exchange_google_code(
    client: reqwest::Client,
    credentials: GoogleCredentials,
    redirect_uri: String,
    code: String,
) -> Result<ExternalIdentity, IdentityProviderError> {
    let response = client
        .post(GOOGLE_TOKEN_ENDPOINT)
        .timeout(REQUEST_TIMEOUT)
        .form(&[
            ("code", code.as_str()),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|error| map_request_error(&error))?;

    let status = response.status();
    if status.is_client_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(IdentityProviderError::Rejected(format!("HTTP {status}: {body}")));
    }
    if !status.is_success() {
        return Err(IdentityProviderError::Unavailable(format!("HTTP {status}")));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|error| IdentityProviderError::Unavailable(error.to_string()))?;

    let response = client
        .get(GOOGLE_USERINFO_ENDPOINT)
        .timeout(REQUEST_TIMEOUT)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|error| map_request_error(&error))?;

    if !response.status().is_success() {
        return Err(IdentityProviderError::Unavailable(format!(
            "HTTP {}",
            response.status()
        )));
    }

    let user_info: GoogleUserInfo = response
        .json()
        .await
        .map_err(|error| IdentityProviderError::Unavailable(error.to_string()))?;

    let email = user_info
        .email
        .filter(|email| !email.trim().is_empty())
        .ok_or(IdentityProviderError::MissingEmail)?;

    Ok(ExternalIdentity {
        subject: user_info.sub,
        email,
        name: user_info.name,
        image: user_info.picture,
    })
}

impl IdentityProvider for GoogleIdentityProvider {
    fn provider_name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", GOOGLE_SCOPES)
            .append_pair("state", state)
            .finish();
        format!("{GOOGLE_AUTHORIZATION_ENDPOINT}?{query}")
    }

    fn exchange_code(
        &self,
        code: &str,
    ) -> BoxFuture<'static, Result<ExternalIdentity, IdentityProviderError>> {
        exchange_google_code(
            self.client.clone(),
            self.credentials.clone(),
            self.redirect_uri.clone(),
            code.to_string(),
        )
        .boxed()
    }
}

// =============================================================================
// Stub Provider (for testing)
// =============================================================================

/// Identity provider that answers every code with a fixed result.
#[derive(Debug, Clone)]
pub struct StubIdentityProvider {
    result: Result<ExternalIdentity, IdentityProviderError>,
}

impl StubIdentityProvider {
    /// Creates a stub that resolves every code to `identity`.
    #[must_use]
    pub const fn with_identity(identity: ExternalIdentity) -> Self {
        Self {
            result: Ok(identity),
        }
    }

    /// Creates a stub that fails every exchange with `error`.
    #[must_use]
    pub const fn failing(error: IdentityProviderError) -> Self {
        Self { result: Err(error) }
    }
}

impl IdentityProvider for StubIdentityProvider {
    fn provider_name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("state", state)
            .finish();
        format!("https://identity.invalid/authorize?{query}")
    }

    fn exchange_code(
        &self,
        _code: &str,
    ) -> BoxFuture<'static, Result<ExternalIdentity, IdentityProviderError>> {
        futures::future::ready(self.result.clone()).boxed()
    }
}

//! Authentication handlers: registration, credentials sign-in, Google OAuth,
//! session lookup and sign-out.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use thiserror::Error;

use super::dto::{RegisterRequest, SignInRequest, SignInResponse, UserResponse};
use super::error::{ApiErrorResponse, ValidationError};
use super::handlers::AppState;
use super::session::{
    AuthSession, OAUTH_STATE_COOKIE, SESSION_COOKIE, oauth_state_cookie, removal_cookie,
    session_cookie,
};
use crate::domain::{AccountLink, Timestamp, User, UserId, normalize_email};
use crate::infrastructure::{
    ExternalIdentity, RepositoryError, generate_state, hash_password, verify_password,
};

// =============================================================================
// Auth Error
// =============================================================================

/// Authentication failures surfaced to the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No user with that email, or the user has no password.
    #[error("Email does not exist or password is incorrect")]
    UnknownAccount,

    /// The password does not match.
    #[error("Incorrect password")]
    IncorrectPassword,

    /// Registration with an email that is already taken.
    #[error("Email is already registered")]
    EmailTaken,

    /// OAuth sign-in for an email owned by an unlinked local account.
    #[error("An account with this email already exists and is not linked to this provider")]
    AccountNotLinked,

    /// The callback `state` does not match the one issued at redirect.
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// The provider redirected back with an error.
    #[error("Sign-in was cancelled or denied: {0}")]
    ProviderDenied(String),

    /// No identity provider is configured.
    #[error("Google sign-in is not configured")]
    OAuthDisabled,
}

impl From<AuthError> for ApiErrorResponse {
    fn from(error: AuthError) -> Self {
        let message = error.to_string();
        match error {
            AuthError::UnknownAccount | AuthError::IncorrectPassword => {
                Self::unauthorized(message)
            }
            AuthError::EmailTaken | AuthError::AccountNotLinked => Self::conflict(message),
            AuthError::StateMismatch | AuthError::ProviderDenied(_) => {
                Self::bad_request("OAUTH_ERROR", message)
            }
            AuthError::OAuthDisabled => Self::service_unavailable(message),
        }
    }
}

// =============================================================================
// POST /auth/register
// =============================================================================

/// Registers a credentials account.
///
/// Registration does not sign the user in.
///
/// # Errors
///
/// - **400 Bad Request**: missing or invalid email or password
/// - **409 Conflict**: email already registered
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiErrorResponse> {
    let Json(request) = payload?;
    let validated = request.validate()?;

    let password_hash = hash_password(validated.password).await?;
    let user = User::new(UserId::generate(), validated.email, Timestamp::now())
        .with_name(validated.name)
        .with_password_hash(password_hash);

    state
        .user_repository
        .insert(&user)
        .await
        .map_err(|error| match error {
            RepositoryError::Conflict(_) => ApiErrorResponse::from(AuthError::EmailTaken),
            other => ApiErrorResponse::from(other),
        })?;
    tracing::info!(user_id = %user.user_id, "Registered user");

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

// =============================================================================
// POST /auth/signin
// =============================================================================

/// Signs in with email and password.
///
/// Returns the token and sets it as the session cookie.
///
/// # Errors
///
/// - **400 Bad Request**: missing email or password
/// - **401 Unauthorized**: unknown email or wrong password
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<SignInResponse>), ApiErrorResponse> {
    let Json(request) = payload?;
    let (email, password) = request.validate()?;

    let user = state
        .user_repository
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::UnknownAccount)?;
    let stored_hash = user.password_hash.clone().ok_or(AuthError::UnknownAccount)?;

    if !verify_password(password, stored_hash).await? {
        tracing::debug!(user_id = %user.user_id, "Rejected sign-in with incorrect password");
        return Err(AuthError::IncorrectPassword.into());
    }

    let token = state.session_keys.issue(&user.user_id)?;
    tracing::info!(user_id = %user.user_id, "Signed in with credentials");

    let jar = jar.add(session_cookie(
        token.clone(),
        state.session_keys.ttl_seconds(),
        state.secure_cookies,
    ));
    Ok((
        jar,
        Json(SignInResponse {
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

// =============================================================================
// POST /auth/signout, GET /auth/session
// =============================================================================

/// Clears the session cookie.
pub async fn sign_out(jar: CookieJar) -> (CookieJar, StatusCode) {
    (jar.add(removal_cookie(SESSION_COOKIE)), StatusCode::NO_CONTENT)
}

/// Returns the signed-in user's profile.
///
/// # Errors
///
/// - **401 Unauthorized**: no valid session
pub async fn current_session(session: AuthSession) -> Json<UserResponse> {
    Json(UserResponse::from(&session.user))
}

// =============================================================================
// GET /auth/google, GET /auth/google/callback
// =============================================================================

/// Starts Google sign-in: stores a fresh `state` in a cookie and redirects
/// to the provider.
///
/// # Errors
///
/// - **503 Service Unavailable**: Google sign-in is not configured
pub async fn google_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiErrorResponse> {
    let provider = state
        .identity_provider
        .as_ref()
        .ok_or(AuthError::OAuthDisabled)?;

    let oauth_state = generate_state();
    let location = provider.authorization_url(&oauth_state);
    let jar = jar.add(oauth_state_cookie(oauth_state, state.secure_cookies));

    Ok((jar, Redirect::to(&location)))
}

/// Query parameters on the OAuth callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthCallbackQuery {
    /// Authorization code.
    #[serde(default)]
    pub code: Option<String>,
    /// Echo of the `state` sent at redirect.
    #[serde(default)]
    pub state: Option<String>,
    /// Error reported by the provider, e.g. `access_denied`.
    #[serde(default)]
    pub error: Option<String>,
}

/// Completes Google sign-in.
///
/// Resolves the identity to a linked user, or creates a user and link when
/// the email is new, then sets the session cookie and redirects to `/`.
///
/// # Errors
///
/// - **400 Bad Request**: state mismatch, missing code, provider rejection
/// - **409 Conflict**: the email belongs to an unlinked account
/// - **503 Service Unavailable**: Google sign-in is not configured or unreachable
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<(CookieJar, Redirect), ApiErrorResponse> {
    let provider = state
        .identity_provider
        .clone()
        .ok_or(AuthError::OAuthDisabled)?;

    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let jar = jar.add(removal_cookie(OAUTH_STATE_COOKIE));

    if let Some(error) = query.error {
        return Err(AuthError::ProviderDenied(error).into());
    }

    match (expected_state.as_deref(), query.state.as_deref()) {
        (Some(expected), Some(received)) if !expected.is_empty() && expected == received => {}
        _ => return Err(AuthError::StateMismatch.into()),
    }

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ValidationError::single("code", "Authorization code is required"))?;

    let identity = provider.exchange_code(&code).await?;
    let user = resolve_external_user(&state, provider.provider_name(), identity).await?;

    let token = state.session_keys.issue(&user.user_id)?;
    tracing::info!(user_id = %user.user_id, provider = provider.provider_name(), "Signed in with OAuth");

    let jar = jar.add(session_cookie(
        token,
        state.session_keys.ttl_seconds(),
        state.secure_cookies,
    ));
    Ok((jar, Redirect::to("/")))
}

/// Finds the user linked to `identity`, or creates one.
async fn resolve_external_user(
    state: &AppState,
    provider: &'static str,
    identity: ExternalIdentity,
) -> Result<User, ApiErrorResponse> {
    let users = &state.user_repository;

    if let Some(user) = users.find_by_account(provider, &identity.subject).await? {
        return Ok(user);
    }

    let email = normalize_email(&identity.email);
    if users.find_by_email(&email).await?.is_some() {
        tracing::warn!(provider, "OAuth email matches an unlinked account");
        return Err(AuthError::AccountNotLinked.into());
    }

    let user = User::new(UserId::generate(), email, Timestamp::now())
        .with_name(identity.name)
        .with_image(identity.image);
    let link = AccountLink::new(user.user_id, provider, identity.subject);

    match users.insert_with_account(&user, &link).await {
        Ok(()) => {
            tracing::info!(user_id = %user.user_id, provider, "Created user from OAuth identity");
            Ok(user)
        }
        Err(RepositoryError::Conflict(_)) => {
            // A concurrent callback for the same identity may have created it.
            if let Some(existing) = users
                .find_by_account(provider, &link.provider_account_id)
                .await?
            {
                return Ok(existing);
            }
            tracing::warn!(provider, "OAuth email matches an unlinked account");
            Err(AuthError::AccountNotLinked.into())
        }
        Err(error) => Err(error.into()),
    }
}

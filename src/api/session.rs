//! Session extraction and cookies.
//!
//! A session token is accepted from `Authorization: Bearer <token>` or from
//! the `session` cookie, in that order.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::error::ApiErrorResponse;
use super::handlers::AppState;
use crate::domain::{User, UserId};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Name of the cookie carrying the OAuth `state` between redirect and callback.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Lifetime of the OAuth `state` cookie.
const OAUTH_STATE_TTL_SECONDS: i64 = 10 * 60;

// =============================================================================
// Extractor
// =============================================================================

/// The signed-in user.
///
/// Rejects with 401 when the token is missing, malformed, expired, badly
/// signed, or names a user that no longer exists.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The user the session belongs to.
    pub user: User,
}

impl AuthSession {
    /// Id of the signed-in user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user.user_id
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| ApiErrorResponse::unauthorized("Sign in required"))?;

        let user_id = state.session_keys.verify(&token)?;

        let user = state
            .user_repository
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| {
                tracing::debug!(%user_id, "Session names an unknown user");
                ApiErrorResponse::unauthorized("Invalid session")
            })?;

        Ok(Self { user })
    }
}

/// Reads the session token from the request headers.
fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Cookies
// =============================================================================

/// Builds the session cookie.
#[must_use]
pub fn session_cookie(token: String, ttl_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(ttl_seconds))
        .build()
}

/// Builds the short-lived OAuth `state` cookie.
#[must_use]
pub fn oauth_state_cookie(state: String, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, state))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(OAUTH_STATE_TTL_SECONDS))
        .build()
}

/// Builds an already-expired cookie that makes the browser drop `name`.
#[must_use]
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name).path("/").build();
    cookie.make_removal();
    cookie
}

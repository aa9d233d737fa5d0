//! Integration tests for the authentication endpoints.
//!
//! # Tests Covered
//!
//! - Registration and credentials sign-in
//! - Session lookup through the bearer header and the cookie
//! - Sign-out
//! - Google OAuth redirect and callback against a stub provider

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use futures::FutureExt;
use rstest::rstest;
use serde_json::json;
use url::Url;

use common::{
    PASSWORD, SECRET, TestApp, cookie_request, empty_request, json_request,
    register_and_sign_in, send, test_app, test_app_with_provider, test_app_with_user_repository,
};
use todo_list_api::domain::{AccountLink, User, UserId};
use todo_list_api::infrastructure::{
    ExternalIdentity, IdentityProviderError, InMemoryUserRepository, RepositoryError,
    RepositoryFuture, SessionKeys, StubIdentityProvider, UserRepository,
};

fn google_identity(email: &str) -> ExternalIdentity {
    ExternalIdentity {
        subject: "google-subject-1".to_string(),
        email: email.to_string(),
        name: Some("Gina Google".to_string()),
        image: Some("https://example.com/avatar.png".to_string()),
    }
}

async fn register(app: &TestApp, body: &serde_json::Value) -> common::TestResponse {
    send(app, json_request(Method::POST, "/auth/register", None, body)).await
}

async fn sign_in(app: &TestApp, email: &str, password: &str) -> common::TestResponse {
    send(
        app,
        json_request(
            Method::POST,
            "/auth/signin",
            None,
            &json!({ "email": email, "password": password }),
        ),
    )
    .await
}

/// Runs the redirect, then the callback with the issued state.
async fn complete_google_sign_in(app: &TestApp) -> common::TestResponse {
    let redirect = send(app, empty_request(Method::GET, "/auth/google", None)).await;
    let state = redirect.cookie("oauth_state").expect("state cookie");
    send(
        app,
        cookie_request(
            Method::GET,
            &format!("/auth/google/callback?code=auth-code&state={state}"),
            &format!("oauth_state={state}"),
        ),
    )
    .await
}

// =============================================================================
// POST /auth/register
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_register_returns_profile() {
    let app = test_app();

    let response = register(
        &app,
        &json!({ "name": " Alice ", "email": "Alice@Example.com", "password": PASSWORD }),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["email"], "alice@example.com");
    assert_eq!(response.body["name"], "Alice");
    assert!(response.body.get("password").is_none());
    assert!(response.body.get("password_hash").is_none());
    assert!(response.cookie("session").is_none());
}

#[rstest]
#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = test_app();
    register(&app, &json!({ "email": "alice@example.com", "password": PASSWORD })).await;

    let response = register(
        &app,
        &json!({ "email": "ALICE@example.com", "password": "another" }),
    )
    .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["code"], "CONFLICT");
}

#[rstest]
#[case(json!({ "password": PASSWORD }), "email")]
#[case(json!({ "email": "alice@example.com" }), "password")]
#[case(json!({ "email": "not-an-email", "password": PASSWORD }), "email")]
#[tokio::test]
async fn test_register_validation(#[case] body: serde_json::Value, #[case] field: &str) {
    let app = test_app();

    let response = register(&app, &body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], field);
}

// =============================================================================
// POST /auth/signin
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_sign_in_sets_session_cookie() {
    let app = test_app();
    register(&app, &json!({ "email": "alice@example.com", "password": PASSWORD })).await;

    let response = sign_in(&app, " Alice@example.com ", PASSWORD).await;

    assert_eq!(response.status, StatusCode::OK);
    let token = response.body["token"].as_str().expect("token");
    assert_eq!(response.cookie("session").as_deref(), Some(token));
    assert_eq!(response.body["user"]["email"], "alice@example.com");

    let raw_cookie = response
        .set_cookie_headers()
        .into_iter()
        .find(|cookie| cookie.starts_with("session="))
        .expect("session Set-Cookie");
    assert!(raw_cookie.contains("HttpOnly"));
    assert!(raw_cookie.contains("Path=/"));
}

#[rstest]
#[tokio::test]
async fn test_sign_in_unknown_email() {
    let app = test_app();

    let response = sign_in(&app, "nobody@example.com", PASSWORD).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.body["message"],
        "Email does not exist or password is incorrect"
    );
}

#[rstest]
#[tokio::test]
async fn test_sign_in_wrong_password() {
    let app = test_app();
    register(&app, &json!({ "email": "alice@example.com", "password": PASSWORD })).await;

    let response = sign_in(&app, "alice@example.com", "wrong password").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Incorrect password");
    assert!(response.cookie("session").is_none());
}

#[rstest]
#[case("", PASSWORD)]
#[case("alice@example.com", "")]
#[tokio::test]
async fn test_sign_in_missing_fields(#[case] email: &str, #[case] password: &str) {
    let app = test_app();

    let response = sign_in(&app, email, password).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test]
async fn test_oauth_only_account_cannot_use_password() {
    let app = test_app_with_provider(StubIdentityProvider::with_identity(google_identity(
        "gina@example.com",
    )));
    complete_google_sign_in(&app).await;

    let response = sign_in(&app, "gina@example.com", PASSWORD).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.body["message"],
        "Email does not exist or password is incorrect"
    );
}

// =============================================================================
// GET /auth/session, POST /auth/signout
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_session_via_bearer_and_cookie() {
    let app = test_app();
    let token = register_and_sign_in(&app, "alice@example.com").await;

    let via_bearer = send(&app, empty_request(Method::GET, "/auth/session", Some(&token))).await;
    assert_eq!(via_bearer.status, StatusCode::OK);
    assert_eq!(via_bearer.body["email"], "alice@example.com");
    assert_eq!(via_bearer.body["name"], "Test User");

    let via_cookie = send(
        &app,
        cookie_request(Method::GET, "/auth/session", &format!("session={token}")),
    )
    .await;
    assert_eq!(via_cookie.status, StatusCode::OK);
    assert_eq!(via_cookie.body["id"], via_bearer.body["id"]);
}

#[rstest]
#[tokio::test]
async fn test_session_rejects_expired_token() {
    let app = test_app();
    let token = register_and_sign_in(&app, "alice@example.com").await;
    let user_id: UserId = send(&app, empty_request(Method::GET, "/auth/session", Some(&token)))
        .await
        .body["id"]
        .as_str()
        .expect("id")
        .parse()
        .expect("uuid");

    let expired = SessionKeys::new(SECRET.as_bytes(), 60)
        .issue_at(&user_id, Utc::now() - Duration::hours(1))
        .expect("issue token");
    let response = send(&app, empty_request(Method::GET, "/auth/session", Some(&expired))).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Session expired");
}

#[rstest]
#[tokio::test]
async fn test_session_rejects_unknown_user() {
    let app = test_app();
    let token = SessionKeys::new(SECRET.as_bytes(), 60)
        .issue(&UserId::generate())
        .expect("issue token");

    let response = send(&app, empty_request(Method::GET, "/auth/session", Some(&token))).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[rstest]
#[tokio::test]
async fn test_session_rejects_foreign_signature() {
    let app = test_app();
    let token = SessionKeys::new(b"some-other-secret-some-other-secret", 60)
        .issue(&UserId::generate())
        .expect("issue token");

    let response = send(&app, empty_request(Method::GET, "/auth/session", Some(&token))).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid session");
}

#[rstest]
#[tokio::test]
async fn test_sign_out_clears_cookie() {
    let app = test_app();

    let response = send(&app, empty_request(Method::POST, "/auth/signout", None)).await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let cleared = response
        .set_cookie_headers()
        .into_iter()
        .find(|cookie| cookie.starts_with("session="))
        .expect("session removal cookie");
    assert!(cleared.contains("Max-Age=0"));
}

// =============================================================================
// Google OAuth
// =============================================================================

#[rstest]
#[case("/auth/google")]
#[case("/auth/google/callback?code=abc&state=xyz")]
#[tokio::test]
async fn test_google_disabled_without_provider(#[case] uri: &str) {
    let app = test_app();

    let response = send(&app, empty_request(Method::GET, uri, None)).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[rstest]
#[tokio::test]
async fn test_google_redirect_sets_state() {
    let app = test_app_with_provider(StubIdentityProvider::with_identity(google_identity(
        "gina@example.com",
    )));

    let response = send(&app, empty_request(Method::GET, "/auth/google", None)).await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let state = response.cookie("oauth_state").expect("state cookie");
    let location = Url::parse(response.location().expect("location")).expect("absolute url");
    let sent_state = location
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned());
    assert_eq!(sent_state.as_deref(), Some(state.as_str()));
}

#[rstest]
#[tokio::test]
async fn test_google_callback_creates_and_reuses_user() {
    let app = test_app_with_provider(StubIdentityProvider::with_identity(google_identity(
        "Gina@Example.com",
    )));

    let first = complete_google_sign_in(&app).await;
    assert_eq!(first.status, StatusCode::SEE_OTHER);
    assert_eq!(first.location(), Some("/"));
    let token = first.cookie("session").expect("session cookie");

    let profile = send(&app, empty_request(Method::GET, "/auth/session", Some(&token))).await;
    assert_eq!(profile.body["email"], "gina@example.com");
    assert_eq!(profile.body["name"], "Gina Google");
    assert_eq!(profile.body["image"], "https://example.com/avatar.png");

    let second = complete_google_sign_in(&app).await;
    let second_token = second.cookie("session").expect("session cookie");
    let second_profile =
        send(&app, empty_request(Method::GET, "/auth/session", Some(&second_token))).await;
    assert_eq!(second_profile.body["id"], profile.body["id"]);
}

/// User repository whose first account-linking write fails.
struct FlakyLinkRepository {
    inner: InMemoryUserRepository,
    failed: AtomicBool,
}

impl FlakyLinkRepository {
    fn new(inner: InMemoryUserRepository) -> Self {
        Self {
            inner,
            failed: AtomicBool::new(false),
        }
    }

    fn fail_first(&self) -> Option<RepositoryFuture<()>> {
        (!self.failed.swap(true, Ordering::SeqCst)).then(|| {
            async { Err(RepositoryError::DatabaseError("connection reset".to_string())) }.boxed()
        })
    }
}

impl UserRepository for FlakyLinkRepository {
    fn find_by_id(&self, id: &UserId) -> RepositoryFuture<Option<User>> {
        self.inner.find_by_id(id)
    }

    fn find_by_email(&self, email: &str) -> RepositoryFuture<Option<User>> {
        self.inner.find_by_email(email)
    }

    fn insert(&self, user: &User) -> RepositoryFuture<()> {
        self.inner.insert(user)
    }

    fn find_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> RepositoryFuture<Option<User>> {
        self.inner.find_by_account(provider, provider_account_id)
    }

    fn link_account(&self, link: &AccountLink) -> RepositoryFuture<()> {
        self.fail_first().unwrap_or_else(|| self.inner.link_account(link))
    }

    fn insert_with_account(&self, user: &User, link: &AccountLink) -> RepositoryFuture<()> {
        self.fail_first()
            .unwrap_or_else(|| self.inner.insert_with_account(user, link))
    }
}

#[rstest]
#[tokio::test]
async fn test_google_callback_recovers_after_failed_account_write() {
    let users = InMemoryUserRepository::new();
    let app = test_app_with_user_repository(
        StubIdentityProvider::with_identity(google_identity("Gina@Example.com")),
        Arc::new(FlakyLinkRepository::new(users.clone())),
    );

    let failed = complete_google_sign_in(&app).await;
    assert_eq!(failed.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(failed.cookie("session").is_none());
    assert_eq!(users.find_by_email("gina@example.com").await.unwrap(), None);

    let retried = complete_google_sign_in(&app).await;
    assert_eq!(retried.status, StatusCode::SEE_OTHER);
    assert_eq!(retried.location(), Some("/"));
    let token = retried.cookie("session").expect("session cookie");
    let profile = send(&app, empty_request(Method::GET, "/auth/session", Some(&token))).await;

    let again = complete_google_sign_in(&app).await;
    let again_token = again.cookie("session").expect("session cookie");
    let again_profile =
        send(&app, empty_request(Method::GET, "/auth/session", Some(&again_token))).await;
    assert_eq!(again_profile.body["id"], profile.body["id"]);
    assert_eq!(again_profile.body["email"], "gina@example.com");
}

#[rstest]
#[tokio::test]
async fn test_google_callback_refuses_unlinked_email() {
    let app = test_app_with_provider(StubIdentityProvider::with_identity(google_identity(
        "alice@example.com",
    )));
    register(&app, &json!({ "email": "alice@example.com", "password": PASSWORD })).await;

    let response = complete_google_sign_in(&app).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(response.cookie("session").is_none());
}

#[rstest]
#[case(Some("oauth_state=expected"), "/auth/google/callback?code=abc&state=forged")]
#[case(None, "/auth/google/callback?code=abc&state=expected")]
#[case(Some("oauth_state=expected"), "/auth/google/callback?code=abc")]
#[tokio::test]
async fn test_google_callback_state_mismatch(#[case] cookie: Option<&str>, #[case] uri: &str) {
    let app = test_app_with_provider(StubIdentityProvider::with_identity(google_identity(
        "gina@example.com",
    )));
    let request = match cookie {
        Some(cookie) => cookie_request(Method::GET, uri, cookie),
        None => empty_request(Method::GET, uri, None),
    };

    let response = send(&app, request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "OAUTH_ERROR");
}

#[rstest]
#[tokio::test]
async fn test_google_callback_provider_error_param() {
    let app = test_app_with_provider(StubIdentityProvider::with_identity(google_identity(
        "gina@example.com",
    )));

    let response = send(
        &app,
        cookie_request(
            Method::GET,
            "/auth/google/callback?error=access_denied&state=s",
            "oauth_state=s",
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[case(IdentityProviderError::Rejected("invalid_grant".to_string()), StatusCode::BAD_REQUEST)]
#[case(IdentityProviderError::MissingEmail, StatusCode::BAD_REQUEST)]
#[case(IdentityProviderError::Unavailable("timeout".to_string()), StatusCode::SERVICE_UNAVAILABLE)]
#[tokio::test]
async fn test_google_callback_exchange_failure(
    #[case] error: IdentityProviderError,
    #[case] expected: StatusCode,
) {
    let app = test_app_with_provider(StubIdentityProvider::failing(error));

    let response = complete_google_sign_in(&app).await;

    assert_eq!(response.status, expected);
}

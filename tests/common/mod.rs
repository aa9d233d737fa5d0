//! Common test helpers for integration tests.
//!
//! Builds an in-memory application, sends requests through the router with
//! `oneshot`, and decodes JSON bodies.
//!
//! # Note
//!
//! The `#![allow(dead_code)]` attribute is necessary because Rust compiles each
//! integration test file as a separate crate; helpers used by only one test
//! file would otherwise warn in the others.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use todo_list_api::api::{AppState, create_router};
use todo_list_api::infrastructure::{
    AuthConfig, Repositories, StubIdentityProvider, UserRepository,
};

/// Session signing key used by every test application.
pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Default password for test accounts.
pub const PASSWORD: &str = "correct horse battery staple";

// =============================================================================
// Application Helpers
// =============================================================================

/// A router plus the state behind it, for seeding and inspection.
#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// Creates a test `AppState` with in-memory repositories and OAuth disabled.
pub fn create_test_app_state() -> AppState {
    let auth = AuthConfig::new(SECRET).expect("valid test secret");
    AppState::from_repositories(Repositories::in_memory(), &auth)
}

/// Creates an application with OAuth disabled.
pub fn test_app() -> TestApp {
    let state = create_test_app_state();
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

/// Creates an application whose OAuth provider is `provider`.
pub fn test_app_with_provider(provider: StubIdentityProvider) -> TestApp {
    let state = create_test_app_state().with_identity_provider(Arc::new(provider));
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

/// Creates a test application with a stub identity provider and a custom
/// user repository.
pub fn test_app_with_user_repository(
    provider: StubIdentityProvider,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
) -> TestApp {
    let mut state = create_test_app_state();
    state.user_repository = user_repository;
    let state = state.with_identity_provider(Arc::new(provider));
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

// =============================================================================
// Request Helpers
// =============================================================================

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Returns the value of the `name` cookie set by this response.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookie_headers()
            .into_iter()
            .find_map(|cookie| {
                let (pair, _) = cookie.split_once(';').unwrap_or((cookie.as_str(), ""));
                let (cookie_name, value) = pair.split_once('=')?;
                (cookie_name.trim() == name).then(|| value.trim().to_string())
            })
    }

    /// Returns every raw `Set-Cookie` header.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Returns the `Location` header.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

/// Sends `request` through the router.
pub async fn send(app: &TestApp, request: Request<Body>) -> TestResponse {
    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body is readable")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Builds a JSON request, authorized with `token` if given.
pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// Builds a request without a body, authorized with `token` if given.
pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("valid request")
}

/// Builds a request carrying a raw `Cookie` header.
pub fn cookie_request(method: Method, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("valid request")
}

// =============================================================================
// Account Helpers
// =============================================================================

/// Registers `email` and signs in, returning the session token.
pub async fn register_and_sign_in(app: &TestApp, email: &str) -> String {
    let registered = send(
        app,
        json_request(
            Method::POST,
            "/auth/register",
            None,
            &json!({ "name": "Test User", "email": email, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);

    let signed_in = send(
        app,
        json_request(
            Method::POST,
            "/auth/signin",
            None,
            &json!({ "email": email, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(signed_in.status, StatusCode::OK, "{:?}", signed_in.body);

    signed_in.body["token"]
        .as_str()
        .expect("token in sign-in response")
        .to_string()
}

// =============================================================================
// Todo Helpers
// =============================================================================

/// Creates a todo and returns the refreshed list body.
pub async fn create_todo(app: &TestApp, token: &str, body: &Value) -> TestResponse {
    send(app, json_request(Method::POST, "/todos", Some(token), body)).await
}

/// Returns the todos array of a list response.
pub fn todos(body: &Value) -> &Vec<Value> {
    body["todos"].as_array().expect("todos array")
}

/// Returns the texts of a list response, in order.
pub fn todo_texts(body: &Value) -> Vec<String> {
    todos(body)
        .iter()
        .map(|todo| todo["text"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Finds a todo by text in a list response.
pub fn find_todo<'a>(body: &'a Value, text: &str) -> &'a Value {
    todos(body)
        .iter()
        .find(|todo| todo["text"] == text)
        .unwrap_or_else(|| panic!("todo {text:?} not in {body}"))
}

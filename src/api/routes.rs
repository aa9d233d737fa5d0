//! Router construction.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{
    current_session, google_callback, google_redirect, register, sign_in, sign_out,
};
use super::handlers::{AppState, health_check};
use super::todos::{create_todo, delete_todo, list_todos, toggle_todo, update_todo};

/// Builds the application router with tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Identity
        .route("/auth/register", post(register))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
        .route("/auth/session", get(current_session))
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
        // Todos
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", put(update_todo).delete(delete_todo))
        .route("/todos/{id}/toggle", post(toggle_todo))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

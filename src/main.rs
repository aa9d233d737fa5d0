//! Todo List API
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres`
//! - `DATABASE_URL`: `PostgreSQL` connection URL (required when `STORAGE_MODE=postgres`)
//! - `AUTH_SECRET`: session signing key, at least 32 bytes (required)
//! - `SESSION_TTL_SECONDS`: session lifetime (default: 30 days)
//! - `AUTH_URL`: public base URL used for OAuth redirects (default: `http://localhost:3000`)
//! - `AUTH_GOOGLE_ID` / `AUTH_GOOGLE_SECRET`: enable Google sign-in
//! - `RUST_LOG`: Logging level (e.g., `debug`, `info`, `todo_list_api=debug`)
//! - `LOG_FORMAT`: `text` (default) | `json`
//! - `HOST`: Server host address (default: `0.0.0.0`)
//! - `PORT`: Server port (default: `3000`)

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_list_api::api::{AppState, create_router};
use todo_list_api::infrastructure::{
    AppConfig, GoogleIdentityProvider, LogFormat, RepositoryFactory,
};

fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "todo_list_api=debug,tower_http=debug".into()),
    );
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

#[tokio::main]
async fn main() {
    // An invalid value is reported once the full configuration loads.
    init_tracing(LogFormat::from_env().unwrap_or_default());

    tracing::info!("Starting Todo List API");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("Configuration error: {}", error);
            std::process::exit(1);
        }
    };

    tracing::info!(
        storage_mode = ?config.repository.storage_mode,
        google_enabled = config.auth.google.is_some(),
        base_url = %config.auth.base_url,
        "Configuration loaded"
    );

    let factory = RepositoryFactory::new(config.repository.clone());
    let repositories = match factory.create().await {
        Ok(repositories) => {
            tracing::info!("Repositories initialized successfully");
            repositories
        }
        Err(error) => {
            tracing::error!("Failed to initialize repositories: {}", error);
            std::process::exit(1);
        }
    };

    let mut application_state = AppState::from_repositories(repositories, &config.auth);
    if let Some(credentials) = config.auth.google.clone() {
        let provider = GoogleIdentityProvider::new(credentials, &config.auth.base_url);
        tracing::info!(redirect_uri = provider.redirect_uri(), "Google sign-in enabled");
        application_state = application_state.with_identity_provider(Arc::new(provider));
    }

    let application = create_router(application_state);

    let address = config.bind_address();
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, "Failed to bind to address {}", address);
            std::process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(address) => tracing::info!("Listening on {}", address),
        Err(error) => tracing::warn!(%error, "Could not determine local address"),
    }

    if let Err(error) = axum::serve(listener, application)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(%error, "Server error");
        std::process::exit(1);
    }

    tracing::info!("Server shutdown complete");
}

/// Completes on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

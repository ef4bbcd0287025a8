use std::net::SocketAddr;

use anyhow::Error as AnyhowError;
use db::{DBService, DbErr};
use server::{AppState, http};
use services::services::{config::WebhookGuardConfig, vault::CredentialVault};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};

const DEFAULT_DATABASE_URL: &str = "sqlite://pos.sqlite?mode=rwc";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).expect("Failed to create tracing filter");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = DBService::connect(&database_url).await?;

    let guard_config = WebhookGuardConfig::from_env();
    tracing::info!(
        rate_limit_max = guard_config.rate_limit_max,
        rate_limit_window_secs = guard_config.rate_limit_window.as_secs(),
        idempotency_ttl_secs = guard_config.idempotency_ttl.as_secs(),
        "Webhook guards configured"
    );

    let state = AppState::new(db, CredentialVault::from_env(), &guard_config);
    spawn_guard_sweeper(state.clone(), guard_config.idempotency_sweep_interval);

    let app = http::router(state);

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let actual_port = listener.local_addr()?.port();
    tracing::info!("Server running on http://{host}:{actual_port}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Periodically evicts expired idempotency entries and rate-limit windows so
/// the in-process caches stay bounded.
fn spawn_guard_sweeper(state: AppState, interval: std::time::Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let evicted_responses = state.idempotency().sweep();
            let evicted_windows = state.rate_limiter().sweep();
            if evicted_responses > 0 || evicted_windows > 0 {
                tracing::info!(
                    evicted_responses,
                    evicted_windows,
                    "Swept expired webhook guard entries"
                );
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {err}");
        return;
    }
    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

//! Shopfront - A lightweight storefront backend

use anyhow::{Context, Result};
use chrono::Duration;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopfront::{
    api::{self, AppState},
    config::Config,
    db,
    services::token::{generate_secret, TokenCodec},
};

/// Upper bound for the configured token lifetime
const MAX_TOKEN_TTL_DAYS: i64 = 365;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopfront=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shopfront...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let secret = if config.auth.token_secret.is_empty() {
        tracing::warn!(
            "auth.token_secret is not set; using a random secret, tokens will not survive a restart"
        );
        generate_secret()
    } else {
        config.auth.token_secret.clone()
    };
    let ttl_days = config.auth.token_ttl_days.clamp(1, MAX_TOKEN_TTL_DAYS);
    let tokens = TokenCodec::new(secret, Duration::days(ttl_days));

    let state = AppState::new(pool.clone(), tokens);

    if let Some((name, email, password)) = config.auth.bootstrap_admin() {
        state
            .user_service
            .ensure_admin(&name, &email, &password)
            .await
            .context("Failed to bootstrap admin user")?;
    }

    let app = api::build_router(state, &config.server.cors_origin)?;

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    tracing::info!("Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

//! dispenser-gateway server entry point.
//!
//! Loads configuration, picks a store, seeds the administrator, hydrates
//! the registry and serves the REST API until Ctrl-C or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use dispenser_gateway::app_state::AppState;
use dispenser_gateway::auth::JwtConfig;
use dispenser_gateway::config::{GatewayConfig, LogFormat};
use dispenser_gateway::persistence::{DispenserStore, MemoryStore, PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(addr = %config.listen_addr, ?config, "starting dispenser-gateway");
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET is not set; using the development signing key");
    }

    // Build persistence layer
    let postgres = if config.persistence_enabled {
        let store = PostgresStore::connect(&config)
            .await
            .context("failed to connect to PostgreSQL")?;
        store.migrate().await.context("failed to run migrations")?;
        tracing::info!("using PostgreSQL store");
        Some(store)
    } else {
        tracing::info!("persistence disabled, using in-memory store");
        None
    };
    let store: Arc<dyn DispenserStore> = match &postgres {
        Some(pg) => Arc::new(pg.clone()),
        None => Arc::new(MemoryStore::new()),
    };

    // Build application state
    let jwt = JwtConfig::new(config.jwt_secret.clone(), config.jwt_expiration_hours);
    let app_state = AppState::new(store, jwt, config.bcrypt_cost);

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        app_state
            .auth_service
            .ensure_admin(username, password)
            .await
            .context("failed to seed admin account")?;
    } else {
        tracing::warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set; admin routes are unreachable");
    }

    app_state
        .dispenser_service
        .hydrate_from_store()
        .await
        .context("failed to load dispensers")?;

    // Build router
    let app = dispenser_gateway::app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(pg) = postgres {
        pg.close().await;
    }
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

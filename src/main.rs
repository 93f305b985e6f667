//! order_desk - CRUD backend for users, orders and trade reports
//!
//! Orders submitted through the API are forwarded to Binance with the
//! owning user's stored credentials, then recorded locally.

mod api;
mod auth;
mod config;
mod db;
mod executor;
mod market;
mod types;

use crate::api::create_router;
use crate::config::Settings;
use crate::db::Database;
use crate::executor::OrderExecutor;
use crate::market::MarketData;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across all handlers
pub struct AppState {
    pub db: Database,
    pub executor: OrderExecutor,
    pub market: MarketData,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (reads .env first)
    let settings = Settings::from_env()?;

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("order_desk v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize database
    info!("Connecting to database...");
    let db = Database::new(&settings.database_url, settings.db_max_connections).await?;
    db.ensure_schema().await?;
    info!("Database connected");

    let timeout = Duration::from_secs(settings.http_timeout_secs);
    let executor = OrderExecutor::new(
        settings.exchange_api_url.clone(),
        settings.recv_window_ms,
        timeout,
    );
    let market = MarketData::new(settings.exchange_public_url.clone(), timeout);
    info!(
        "Exchange endpoints: orders={} market={}",
        executor.base_url(),
        settings.exchange_public_url
    );

    // Create application state
    let state = Arc::new(AppState { db, executor, market });

    // Create router with all API endpoints
    let app = create_router(state);

    // Start server
    let ip: std::net::IpAddr = settings.host.parse()?;
    let addr = SocketAddr::from((ip, settings.port));
    info!("Starting API server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

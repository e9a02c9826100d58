mod api;
mod config;
mod db;
mod error;
mod matching;
mod models;
mod scoring;
mod services;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mackerel")]
#[command(about = "Admin backend for trap-neuter-return rescue operations")]
struct Args {
    /// Run one duplicate-detection scan before serving requests
    #[arg(long)]
    scan_on_startup: bool,
}

use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::db::{Database, LibSqlBackend, MatchingOracle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mackerel=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.server.api_keys.is_empty() {
        tracing::warn!(
            "MACKEREL_API_KEYS is not set; review endpoints are locked. Set MACKEREL_API_KEYS to enable access."
        );
    }

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db_backend = LibSqlBackend::new(raw_db);
    // Wrap in Arc<dyn MatchingOracle> immediately so we can clone it
    let db: Arc<dyn MatchingOracle> = Arc::new(db_backend);

    let state = AppState::new(config.clone(), db);

    if args.scan_on_startup {
        tracing::info!("Running startup duplicate-detection scan...");
        match state.detection.run_once().await {
            Ok(summary) => tracing::info!(
                "Startup scan complete: {} pairs evaluated, {} candidates created",
                summary.pairs_evaluated,
                summary.candidates_created
            ),
            Err(e) => tracing::error!("Startup scan failed: {}", e),
        }
    }

    let cancel_token = CancellationToken::new();

    if state.config.matching.scan_enabled {
        tracing::info!(
            "Starting detection scan loop... (interval={}s)",
            state.config.matching.scan_interval_secs
        );
        let detection = state.detection.clone();
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Detection scan loop shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(detection.interval_secs())) => {
                        if let Err(e) = detection.run_once().await {
                            tracing::error!("Detection scan error: {}", e);
                        }
                    }
                }
            }
        });
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Mackerel starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    cancel_token.cancel();
}

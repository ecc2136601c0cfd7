//! Dayplan HTTP server
//!
//! A thin axum layer over the Rust core (dayplan-core). Serves
//! `GET /api/chains/today` for authenticated callers.

mod auth;
mod routes;
mod state;

use std::path::PathBuf;

use clap::Parser;
use dayplan_core::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dayplan-server", version, about = "Dayplan HTTP server")]
struct Cli {
    /// Path to config.toml (defaults to ~/.config/dayplan/config.toml)
    #[arg(long, env = "DAYPLAN_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides server.bind
    #[arg(long, env = "DAYPLAN_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dayplan_server=info,dayplan_core=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if config.server.tokens.is_empty() {
        tracing::warn!("no server.tokens configured; every API request will be rejected");
    }

    let state = state::AppState::from_config(&config)?;
    let app = routes::create_router(state);

    let addr = cli.bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

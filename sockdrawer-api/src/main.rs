//! sockdrawer-api - Guess bridge service
//!
//! HTTP/JSON-RPC front end that classifies social-media accounts as bot or
//! human by relaying their recent posts to the scoring service.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sockdrawer_api::{build_router, AppState};
use sockdrawer_common::config::{BridgeConfig, ConfigOverrides};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for sockdrawer-api
///
/// Every setting can also come from the environment or the TOML config
/// file; command line wins, then environment, then file.
#[derive(Parser, Debug)]
#[command(name = "sockdrawer-api")]
#[command(about = "Bot-or-human guess service for social-media accounts")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "SOCKDRAWER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "SOCKDRAWER_BIND_ADDR")]
    bind_addr: Option<String>,

    /// Scoring service endpoint, e.g. tcp://127.0.0.1:5555
    #[arg(long, env = "SOCKDRAWER_SCORING_ENDPOINT")]
    scoring_endpoint: Option<String>,

    /// Scoring reply deadline in milliseconds
    #[arg(long, env = "SOCKDRAWER_SCORING_TIMEOUT_MS")]
    scoring_timeout_ms: Option<u64>,

    /// Longest accepted request URL in bytes
    #[arg(long, env = "SOCKDRAWER_MAX_URL_LENGTH")]
    max_url_length: Option<usize>,

    /// Recent posts fetched per account
    #[arg(long, env = "SOCKDRAWER_POST_LIMIT")]
    post_limit: Option<usize>,

    /// Content source base URL
    #[arg(long, env = "SOCKDRAWER_CONTENT_SOURCE_URL")]
    content_source_url: Option<String>,

    /// Content fetch timeout in milliseconds
    #[arg(long, env = "SOCKDRAWER_CONTENT_TIMEOUT_MS")]
    content_timeout_ms: Option<u64>,

    /// Content cache lifetime in seconds (0 disables)
    #[arg(long, env = "SOCKDRAWER_CONTENT_CACHE_TTL_SECS")]
    content_cache_ttl_secs: Option<u64>,

    /// Most entries kept in the content cache
    #[arg(long, env = "SOCKDRAWER_CONTENT_CACHE_CAPACITY")]
    content_cache_capacity: Option<usize>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_addr: self.bind_addr.clone(),
            scoring_endpoint: self.scoring_endpoint.clone(),
            scoring_timeout_ms: self.scoring_timeout_ms,
            max_url_length: self.max_url_length,
            post_limit: self.post_limit,
            content_source_url: self.content_source_url.clone(),
            content_timeout_ms: self.content_timeout_ms,
            content_cache_ttl_secs: self.content_cache_ttl_secs,
            content_cache_capacity: self.content_cache_capacity,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sockdrawer_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting Sockdrawer guess service (sockdrawer-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config = BridgeConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(args.overrides());
    config.validate().context("Invalid configuration")?;

    info!("Scoring endpoint: {}", config.scoring_endpoint);
    info!("Content source: {}", config.content_source_url);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::from_config(config).context("Failed to initialize content source")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("sockdrawer-api listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

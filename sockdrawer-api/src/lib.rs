//! sockdrawer-api library - Guess bridge service
//!
//! Answers "is this account a bot?" over HTTP/JSON-RPC by fetching each
//! account's recent posts and asking the scoring service about them.

use axum::Router;
use sockdrawer_common::BridgeConfig;
use std::sync::Arc;
use tracing::info;

pub mod api;
pub mod content;
pub mod error;
pub mod guess;
pub mod identifiers;
pub mod probe;
pub mod scoring;

use content::{CachedContentSource, ContentError, ContentSource, HttpContentSource};
use guess::GuessOrchestrator;
use scoring::{ScoringConnector, ZmqConnector};

/// Application state shared across HTTP handlers
///
/// Read-only; each request builds its own scoring channel from `connector`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BridgeConfig>,
    pub content: Arc<dyn ContentSource>,
    pub connector: Arc<dyn ScoringConnector>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: BridgeConfig,
        content: Arc<dyn ContentSource>,
        connector: Arc<dyn ScoringConnector>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            content,
            connector,
        }
    }

    /// Wire the HTTP content source and ZeroMQ connector from configuration
    pub fn from_config(config: BridgeConfig) -> Result<Self, ContentError> {
        let http_source = Arc::new(HttpContentSource::new(
            config.content_source_url.clone(),
            config.content_timeout(),
        )?);

        let cache = config
            .content_cache_ttl()
            .zip(config.content_cache_capacity());
        let content: Arc<dyn ContentSource> = match cache {
            Some((ttl, capacity)) => {
                info!(
                    "Content cache enabled (ttl {}s, capacity {})",
                    ttl.as_secs(),
                    capacity
                );
                Arc::new(CachedContentSource::new(http_source, ttl, capacity))
            }
            None => {
                info!("Content cache disabled");
                http_source
            }
        };

        let connector = Arc::new(ZmqConnector::new(config.scoring_endpoint.clone()));

        Ok(Self::new(config, content, connector))
    }

    /// Orchestrator for one batch
    pub fn orchestrator(&self) -> GuessOrchestrator {
        GuessOrchestrator::new(
            self.content.clone(),
            self.connector.clone(),
            self.config.post_limit,
            self.config.scoring_timeout(),
        )
    }
}

/// Build application router
///
/// `/api/1/user` and its `/user` alias run the preflight checks before any
/// handler; health and build info do not.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::trace::TraceLayer;

    Router::new()
        .nest("/api/1", api::user_routes(state.clone()))
        .merge(api::user_routes(state.clone()))
        .merge(api::health_routes())
        .route("/build_info", get(api::get_build_info))
        .fallback(api::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

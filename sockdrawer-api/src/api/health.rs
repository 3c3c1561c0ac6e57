//! Health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::scoring::ScoringChannel;
use crate::AppState;

/// Health check response
/// Returns status, module name, and version
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

impl HealthResponse {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            module: "sockdrawer-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// GET /health
///
/// Liveness of this process only; does not touch the scoring service.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// GET /health/scoring
///
/// Pings the scoring service on a channel of its own. Fails with the same
/// error envelope as a guess request would.
pub async fn scoring_health(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, BridgeError> {
    let mut channel = ScoringChannel::new(state.connector.clone());
    channel.ping(state.config.scoring_timeout()).await?;
    Ok(Json(HealthResponse::ok()))
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/scoring", get(scoring_health))
}

//! GET /build_info

use axum::response::Json;
use serde::{Deserialize, Serialize};

/// Which build of the service is answering
#[derive(Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub module: String,
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
}

impl BuildInfo {
    /// Values baked in by build.rs
    pub fn current() -> Self {
        Self {
            module: "sockdrawer-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_hash: env!("GIT_HASH").to_string(),
            build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
            build_profile: env!("BUILD_PROFILE").to_string(),
        }
    }
}

pub async fn get_build_info() -> Json<BuildInfo> {
    Json(BuildInfo::current())
}

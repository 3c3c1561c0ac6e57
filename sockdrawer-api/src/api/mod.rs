//! HTTP API handlers for sockdrawer-api

pub mod buildinfo;
pub mod health;
pub mod preflight;
pub mod user;

use axum::http::{Method, Uri};

use crate::error::BridgeError;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use preflight::preflight;
pub use user::{get_user, post_user, user_routes};

/// Fallback for unknown paths
pub async fn not_found(uri: Uri) -> BridgeError {
    BridgeError::NotFound(uri.path().to_string())
}

/// Fallback for known paths with an unsupported HTTP method
pub async fn method_not_allowed(method: Method, uri: Uri) -> BridgeError {
    BridgeError::MethodNotAllowed(format!("{} {}", method, uri.path()))
}

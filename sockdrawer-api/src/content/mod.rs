//! Content source adapter
//!
//! Fetches an account's recent post texts. The source itself is a black box;
//! this module only fixes the interface and the three ways a fetch can fail.

pub mod cache;
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::identifiers::Identifier;

pub use cache::CachedContentSource;
pub use http::HttpContentSource;

/// Content source failures
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    /// Account is private, suspended or does not exist
    #[error("account unavailable: {0}")]
    Unavailable(String),

    /// Source did not answer in time
    #[error("content source timed out: {0}")]
    Timeout(String),

    /// Source could not be reached or answered with something unusable
    #[error("content source unreachable: {0}")]
    Unreachable(String),
}

/// Source of recent post texts for an account
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Up to `limit` most recent post texts, newest first
    async fn recent_posts(
        &self,
        id: &Identifier,
        limit: usize,
    ) -> Result<Vec<String>, ContentError>;
}

//! HTTP content source client
//!
//! Queries `{base}/posts?screen_name=<handle>&limit=<n>` (or `user_id=<n>`
//! for numeric IDs). The body is a JSON array whose items are either post
//! objects with a `text` field or bare strings.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{ContentError, ContentSource};
use crate::identifiers::Identifier;

const USER_AGENT: &str = concat!("sockdrawer/", env!("CARGO_PKG_VERSION"));

/// One post as returned by the content source
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PostItem {
    Text(String),
    Post { text: String },
}

impl PostItem {
    fn into_text(self) -> String {
        match self {
            PostItem::Text(text) | PostItem::Post { text } => text,
        }
    }
}

/// Content source reached over HTTP
pub struct HttpContentSource {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpContentSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ContentError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ContentError::Unreachable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn query_for(id: &Identifier, limit: usize) -> Vec<(&'static str, String)> {
        let key = match id {
            Identifier::Numeric(_) => "user_id",
            Identifier::Handle(_) => "screen_name",
        };
        vec![(key, id.to_string()), ("limit", limit.to_string())]
    }
}

fn classify(e: reqwest::Error) -> ContentError {
    if e.is_timeout() {
        ContentError::Timeout(e.to_string())
    } else {
        ContentError::Unreachable(e.to_string())
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn recent_posts(
        &self,
        id: &Identifier,
        limit: usize,
    ) -> Result<Vec<String>, ContentError> {
        let url = format!("{}/posts", self.base_url);

        tracing::debug!(id = %id, url = %url, "Querying content source");

        let response = self
            .http_client
            .get(&url)
            .query(&Self::query_for(id, limit))
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();

        if status == 403 || status == 404 || status == 410 {
            return Err(ContentError::Unavailable(format!("{} ({})", id, status.as_u16())));
        }

        if !status.is_success() {
            return Err(ContentError::Unreachable(format!(
                "content source answered {} for {}",
                status.as_u16(),
                id
            )));
        }

        let items: Vec<PostItem> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ContentError::Timeout(e.to_string())
            } else {
                ContentError::Unreachable(format!("undecodable posts for {}: {}", id, e))
            }
        })?;

        Ok(items.into_iter().take(limit).map(PostItem::into_text).collect())
    }
}

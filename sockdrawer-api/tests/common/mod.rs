//! Shared fakes for sockdrawer-api integration tests
//!
//! The fake scoring service reads each post text as its own score, so a
//! test picks an account's verdict by picking its posts.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use serde_json::{json, Value};
use sockdrawer_api::content::{ContentError, ContentSource};
use sockdrawer_api::identifiers::Identifier;
use sockdrawer_api::scoring::{ScoringConnector, ScoringTransport, TransportError};
use sockdrawer_api::{build_router, AppState};
use sockdrawer_common::BridgeConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Content source backed by a fixed table
///
/// Unknown accounts are unavailable.
#[derive(Default)]
pub struct FakeContent {
    accounts: HashMap<String, Result<Vec<String>, ContentError>>,
    pub fetches: AtomicUsize,
}

impl FakeContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(mut self, id: &str, posts: &[&str]) -> Self {
        let posts = posts.iter().map(|p| p.to_string()).collect();
        self.accounts.insert(id.to_string(), Ok(posts));
        self
    }

    pub fn with_error(mut self, id: &str, error: ContentError) -> Self {
        self.accounts.insert(id.to_string(), Err(error));
        self
    }
}

#[async_trait]
impl ContentSource for FakeContent {
    async fn recent_posts(
        &self,
        id: &Identifier,
        limit: usize,
    ) -> Result<Vec<String>, ContentError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.accounts.get(&id.to_string()) {
            Some(Ok(posts)) => Ok(posts.iter().take(limit).cloned().collect()),
            Some(Err(e)) => Err(e.clone()),
            None => Err(ContentError::Unavailable(format!("{} not found", id))),
        }
    }
}

/// How the fake scoring service behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scorer {
    /// Score each post by parsing its text as a number; answer pings
    Echo,
    /// Accept requests, never reply
    Silent,
    /// Refuse connections
    Refuse,
    /// Reply under a different correlation ID
    WrongId,
}

/// Scoring connector that records what it was asked
pub struct FakeScoring {
    scorer: Scorer,
    pub connects: AtomicUsize,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeScoring {
    pub fn new(scorer: Scorer) -> Arc<Self> {
        Arc::new(Self {
            scorer,
            connects: AtomicUsize::new(0),
            requests: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ScoringConnector for FakeScoring {
    async fn connect(&self) -> Result<Box<dyn ScoringTransport>, TransportError> {
        if self.scorer == Scorer::Refuse {
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSocket {
            scorer: self.scorer,
            pending: None,
            requests: self.requests.clone(),
        }))
    }
}

struct FakeSocket {
    scorer: Scorer,
    pending: Option<Value>,
    requests: Arc<Mutex<Vec<Value>>>,
}

#[async_trait]
impl ScoringTransport for FakeSocket {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        assert!(self.pending.is_none(), "send on a socket still owing a reply");
        let request: Value = serde_json::from_str(&frame).unwrap();
        self.requests.lock().unwrap().push(request.clone());
        self.pending = Some(request);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let request = self.pending.take().expect("recv before send");
        let id = request["id"].as_i64().unwrap();

        let reply = match self.scorer {
            Scorer::Silent => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Scorer::WrongId => json!({"jsonrpc": "2.0", "id": id - 1, "result": [0.0]}),
            Scorer::Echo if request["method"] == "ping" => {
                json!({"jsonrpc": "2.0", "id": id, "result": "pong"})
            }
            _ => {
                let scores: Vec<f64> = request["params"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|post| post.as_str().unwrap().parse().unwrap())
                    .collect();
                json!({"jsonrpc": "2.0", "id": id, "result": scores})
            }
        };
        Ok(serde_json::to_vec(&reply).unwrap())
    }
}

/// Config with a short scoring deadline so timeout tests stay fast
pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        scoring_timeout_ms: 100,
        ..BridgeConfig::default()
    }
}

/// Content with one bot, one human and the rest unavailable
pub fn standard_content() -> FakeContent {
    FakeContent::new()
        .with_posts("JesseT_G", &["0.9", "0.7", "0.8"])
        .with_posts("18105480", &["0.1", "0.2"])
        .with_posts("kennethreitz", &["0.0"])
        .with_posts("gvanrossum", &["0.3", "0.1"])
}

pub fn setup_app(content: FakeContent, scoring: Arc<FakeScoring>) -> axum::Router {
    setup_app_with_config(test_config(), content, scoring)
}

pub fn setup_app_with_config(
    config: BridgeConfig,
    content: FakeContent,
    scoring: Arc<FakeScoring>,
) -> axum::Router {
    let state = AppState::new(config, Arc::new(content), scoring);
    build_router(state)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

//! Scoring service channel
//!
//! The scoring service is reached over a lock-step request/reply socket: a
//! socket that has sent a request must receive exactly one reply before it
//! may send again. [`ScoringChannel`] owns at most one such socket and
//! enforces that discipline:
//!
//! - exchanges take `&mut self`, so one channel never runs two at once
//! - a socket that timed out, failed, or returned a bad reply is discarded,
//!   and the next exchange connects a fresh one
//! - a socket left waiting for a reply (the exchange future was dropped
//!   between send and receive) is discarded before it is used again
//!
//! A channel is owned by the request that created it and closes its socket
//! when dropped.

pub mod zmq;

use async_trait::async_trait;
use serde_json::Value;
use sockdrawer_common::jsonrpc::{
    random_correlation_id, RpcError, RpcRequest, RpcResponse, JSONRPC_VERSION,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub use self::zmq::ZmqConnector;

/// Transport-level failures of one socket
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Recv(String),
}

/// One connected request/reply socket
///
/// Implementations only move frames; ordering is enforced by
/// [`ScoringChannel`].
#[async_trait]
pub trait ScoringTransport: Send {
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError>;
}

/// Opens sockets to the scoring service
#[async_trait]
pub trait ScoringConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ScoringTransport>, TransportError>;
}

/// Why an exchange produced no usable reply
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no reply from scoring service within {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    #[error("scoring service unavailable: {0}")]
    Unavailable(String),

    #[error("scoring service protocol violation: {0}")]
    ProtocolViolation(String),
}

/// Call made on the scoring service
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringMethod {
    /// Score each post text
    Guess(Vec<String>),
    /// Liveness probe, answered with `"pong"`
    Ping,
}

/// One request to the scoring service
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRequest {
    pub id: i64,
    pub method: ScoringMethod,
}

impl ScoringRequest {
    /// Guess request with a fresh correlation ID
    pub fn guess(posts: Vec<String>) -> Self {
        Self {
            id: random_correlation_id(),
            method: ScoringMethod::Guess(posts),
        }
    }

    /// Ping request with a fresh correlation ID
    pub fn ping() -> Self {
        Self {
            id: random_correlation_id(),
            method: ScoringMethod::Ping,
        }
    }

    /// JSON text frame sent on the wire
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        match &self.method {
            ScoringMethod::Guess(posts) => {
                serde_json::to_string(&RpcRequest::new(self.id, "guess", Some(posts)))
            }
            ScoringMethod::Ping => {
                serde_json::to_string(&RpcRequest::<()>::new(self.id, "ping", None))
            }
        }
    }
}

/// Decoded reply, already matched to its request
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringReply {
    pub id: i64,
    pub outcome: Result<Value, RpcError>,
}

impl ScoringReply {
    /// Decode a reply frame and check it answers `request_id`
    pub fn decode(raw: &[u8], request_id: i64) -> Result<Self, ChannelError> {
        let response: RpcResponse<Value> = serde_json::from_slice(raw)
            .map_err(|e| ChannelError::ProtocolViolation(format!("undecodable reply: {}", e)))?;

        if response.jsonrpc != JSONRPC_VERSION {
            return Err(ChannelError::ProtocolViolation(format!(
                "unexpected jsonrpc version {:?}",
                response.jsonrpc
            )));
        }

        match response.id {
            Some(id) if id == request_id => {}
            other => {
                return Err(ChannelError::ProtocolViolation(format!(
                    "reply id {:?} does not match request id {}",
                    other, request_id
                )))
            }
        }

        let outcome = match (response.result, response.error) {
            (Some(result), None) => Ok(result),
            (None, Some(error)) => Err(error),
            _ => {
                return Err(ChannelError::ProtocolViolation(
                    "reply must carry exactly one of result and error".to_string(),
                ))
            }
        };

        Ok(Self {
            id: request_id,
            outcome,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketState {
    Idle,
    AwaitingReply,
}

/// Lock-step request/reply client owning at most one socket
pub struct ScoringChannel {
    connector: Arc<dyn ScoringConnector>,
    socket: Option<Box<dyn ScoringTransport>>,
    state: SocketState,
    opened: usize,
}

impl ScoringChannel {
    /// Create a channel; no socket is opened until the first exchange
    pub fn new(connector: Arc<dyn ScoringConnector>) -> Self {
        Self {
            connector,
            socket: None,
            state: SocketState::Idle,
            opened: 0,
        }
    }

    /// Number of sockets this channel has opened so far
    pub fn sockets_opened(&self) -> usize {
        self.opened
    }

    /// Send `request` and wait up to `timeout` for its reply
    ///
    /// Connecting, sending and receiving share the one deadline.
    pub async fn exchange(
        &mut self,
        request: &ScoringRequest,
        timeout: Duration,
    ) -> Result<ScoringReply, ChannelError> {
        if self.state == SocketState::AwaitingReply {
            warn!("Discarding scoring socket left waiting for a reply");
            self.discard();
        }

        let frame = request
            .to_frame()
            .map_err(|e| ChannelError::ProtocolViolation(format!("unencodable request: {}", e)))?;

        let outcome = tokio::time::timeout(timeout, self.round_trip(frame)).await;
        let raw = match outcome {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                self.discard();
                return Err(ChannelError::Unavailable(e.to_string()));
            }
            Err(_) => {
                self.discard();
                return Err(ChannelError::Timeout { timeout });
            }
        };
        self.state = SocketState::Idle;

        ScoringReply::decode(&raw, request.id).map_err(|e| {
            self.discard();
            e
        })
    }

    /// Check the scoring service answers a ping within `timeout`
    pub async fn ping(&mut self, timeout: Duration) -> Result<(), ChannelError> {
        let reply = self.exchange(&ScoringRequest::ping(), timeout).await?;
        match reply.outcome {
            Ok(Value::String(s)) if s == "pong" => Ok(()),
            Ok(other) => Err(ChannelError::ProtocolViolation(format!(
                "unexpected ping result {}",
                other
            ))),
            Err(error) => Err(ChannelError::ProtocolViolation(format!(
                "ping failed with code {}: {}",
                error.code, error.message
            ))),
        }
    }

    async fn round_trip(&mut self, frame: String) -> Result<Vec<u8>, TransportError> {
        if self.socket.is_none() {
            let socket = self.connector.connect().await?;
            self.opened += 1;
            debug!("Opened scoring socket #{}", self.opened);
            self.socket = Some(socket);
        }

        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| TransportError::Connect("socket not open".to_string()))?;

        socket.send(frame).await?;
        self.state = SocketState::AwaitingReply;
        socket.recv().await
    }

    fn discard(&mut self) {
        if self.socket.take().is_some() {
            debug!("Discarded scoring socket");
        }
        self.state = SocketState::Idle;
    }
}

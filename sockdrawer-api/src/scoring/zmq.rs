//! ZeroMQ REQ socket transport
//!
//! A REQ socket refuses a second send until the first reply arrives, which
//! is the lock-step discipline [`ScoringChannel`](super::ScoringChannel)
//! relies on. Dropping the socket closes it.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use zeromq::{ReqSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use super::{ScoringConnector, ScoringTransport, TransportError};

const RECONNECT_INTERVAL_MS: u64 = 100;

/// Opens REQ sockets connected to the scoring service endpoint
#[derive(Debug, Clone)]
pub struct ZmqConnector {
    endpoint: String,
    reconnect_interval: Duration,
}

impl ZmqConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_interval: Duration::from_millis(RECONNECT_INTERVAL_MS),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ScoringConnector for ZmqConnector {
    /// Connect, re-attempting until the peer accepts
    ///
    /// Never gives up on its own: callers bound it with the exchange
    /// deadline, so an absent service always surfaces as a timeout.
    async fn connect(&self) -> Result<Box<dyn ScoringTransport>, TransportError> {
        loop {
            let mut socket = ReqSocket::new();
            match socket.connect(&self.endpoint).await {
                Ok(()) => {
                    debug!("Connected REQ socket to {}", self.endpoint);
                    return Ok(Box::new(ZmqTransport { socket }));
                }
                Err(e) => {
                    debug!("Connect to {} failed ({}), retrying", self.endpoint, e);
                    tokio::time::sleep(self.reconnect_interval).await;
                }
            }
        }
    }
}

/// One connected REQ socket
pub struct ZmqTransport {
    socket: ReqSocket,
}

#[async_trait]
impl ScoringTransport for ZmqTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.socket
            .send(ZmqMessage::from(frame))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let message = self
            .socket
            .recv()
            .await
            .map_err(|e| TransportError::Recv(e.to_string()))?;

        message
            .get(0)
            .map(|frame| frame.to_vec())
            .ok_or_else(|| TransportError::Recv("empty reply message".to_string()))
    }
}

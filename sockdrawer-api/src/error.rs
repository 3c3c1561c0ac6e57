//! Error taxonomy for sockdrawer-api
//!
//! Every failure that ends a request maps onto exactly one [`BridgeError`],
//! which fixes both the HTTP status and the JSON-RPC error code of the
//! response. Per-identifier "account unavailable" is not an error; it becomes
//! an `unavailable` verdict.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use sockdrawer_common::jsonrpc::{
    random_correlation_id, RpcError, RpcResponse, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PARSE_ERROR,
};
use thiserror::Error;

use crate::content::ContentError;
use crate::identifiers::ParseError;
use crate::scoring::ChannelError;

/// Request-ending failure
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Malformed `ids` argument (400)
    #[error("{0}")]
    InvalidIds(#[from] ParseError),

    /// Unknown or repeated query parameter, malformed `params` (400)
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// POST body is not JSON (400)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// POST body is not a JSON-RPC request object (400)
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    /// POST names a method other than `guess` (404)
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// No such route (404)
    #[error("Not Found: {0}")]
    NotFound(String),

    /// Route exists but not for this HTTP method (405)
    #[error("Method Not Allowed: {0}")]
    MethodNotAllowed(String),

    /// Accept header excludes JSON (406)
    #[error("Not Acceptable")]
    NotAcceptable,

    /// Request URL longer than the configured maximum (414)
    #[error("Request URI Too Long: {length} bytes exceeds the {max} byte limit")]
    RequestTooLong { length: usize, max: usize },

    /// POST body is not declared as JSON (415)
    #[error("Unsupported Media Type: {0}")]
    UnsupportedMediaType(String),

    /// Scoring reply malformed, mismatched, or an error object (502)
    #[error("Bad reply from model server: {0}")]
    ProtocolViolation(String),

    /// Content source unreachable or answered unusably (502)
    #[error("Failed to connect to content source: {0}")]
    ContentSourceUnreachable(String),

    /// Scoring channel unreachable or dropped (503)
    #[error("Model server unavailable: {0}")]
    UpstreamUnavailable(String),

    /// No scoring reply within the deadline (504)
    #[error("Failed to get response from model server within {timeout_ms}ms")]
    UpstreamTimeout { timeout_ms: u64 },

    /// Content source did not answer in time (504)
    #[error("Failed to get response from content source in time: {0}")]
    ContentSourceTimeout(String),
}

impl BridgeError {
    /// HTTP status of the response carrying this error
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::InvalidIds(_)
            | BridgeError::InvalidParams(_)
            | BridgeError::ParseError(_)
            | BridgeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::MethodNotFound(_) | BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            BridgeError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            BridgeError::RequestTooLong { .. } => StatusCode::URI_TOO_LONG,
            BridgeError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            BridgeError::ProtocolViolation(_) | BridgeError::ContentSourceUnreachable(_) => {
                StatusCode::BAD_GATEWAY
            }
            BridgeError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::UpstreamTimeout { .. } | BridgeError::ContentSourceTimeout(_) => {
                StatusCode::GATEWAY_TIMEOUT
            }
        }
    }

    /// JSON-RPC error code
    ///
    /// Validation failures use the reserved JSON-RPC codes; policy and
    /// transport failures reuse their HTTP status.
    pub fn rpc_code(&self) -> i64 {
        match self {
            BridgeError::InvalidIds(_) | BridgeError::InvalidParams(_) => INVALID_PARAMS,
            BridgeError::ParseError(_) => PARSE_ERROR,
            BridgeError::InvalidRequest(_) => INVALID_REQUEST,
            BridgeError::MethodNotFound(_) => METHOD_NOT_FOUND,
            _ => i64::from(self.status().as_u16()),
        }
    }

    /// Short, stable message for the JSON-RPC error object
    ///
    /// The full description goes in `error.data`.
    pub fn summary(&self) -> &'static str {
        match self {
            BridgeError::InvalidIds(_) | BridgeError::InvalidParams(_) => "Invalid params",
            BridgeError::ParseError(_) => "Parse error",
            BridgeError::InvalidRequest(_) => "Invalid Request",
            BridgeError::MethodNotFound(_) => "Method not found",
            _ => self.status().canonical_reason().unwrap_or("Error"),
        }
    }

    /// Build the JSON-RPC error response with the given response id
    pub fn into_envelope(self, id: Option<i64>) -> Response {
        let status = self.status();
        let error = RpcError::with_data(
            self.rpc_code(),
            self.summary(),
            Value::String(self.to_string()),
        );
        let body: RpcResponse<()> = RpcResponse::failure(id, error);
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        self.into_envelope(Some(random_correlation_id()))
    }
}

impl From<ChannelError> for BridgeError {
    fn from(e: ChannelError) -> Self {
        match e {
            ChannelError::Timeout { timeout } => BridgeError::UpstreamTimeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            ChannelError::Unavailable(msg) => BridgeError::UpstreamUnavailable(msg),
            ChannelError::ProtocolViolation(msg) => BridgeError::ProtocolViolation(msg),
        }
    }
}

/// Batch-aborting content failures; `Unavailable` never reaches here
impl From<ContentError> for BridgeError {
    fn from(e: ContentError) -> Self {
        match e {
            ContentError::Timeout(msg) => BridgeError::ContentSourceTimeout(msg),
            ContentError::Unreachable(msg) | ContentError::Unavailable(msg) => {
                BridgeError::ContentSourceUnreachable(msg)
            }
        }
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_table() {
        let cases = [
            (BridgeError::InvalidIds(ParseError::EmptyArgument), 400, INVALID_PARAMS),
            (BridgeError::ParseError("x".into()), 400, PARSE_ERROR),
            (BridgeError::InvalidRequest("x".into()), 400, INVALID_REQUEST),
            (BridgeError::MethodNotFound("x".into()), 404, METHOD_NOT_FOUND),
            (BridgeError::NotAcceptable, 406, 406),
            (BridgeError::RequestTooLong { length: 10, max: 5 }, 414, 414),
            (BridgeError::UnsupportedMediaType("text/plain".into()), 415, 415),
            (BridgeError::ProtocolViolation("x".into()), 502, 502),
            (BridgeError::UpstreamUnavailable("x".into()), 503, 503),
            (BridgeError::UpstreamTimeout { timeout_ms: 5 }, 504, 504),
            (BridgeError::ContentSourceTimeout("x".into()), 504, 504),
            (BridgeError::ContentSourceUnreachable("x".into()), 502, 502),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status().as_u16(), status, "{:?}", error);
            assert_eq!(error.rpc_code(), code, "{:?}", error);
        }
    }

    #[test]
    fn test_channel_errors_map_to_upstream_kinds() {
        let timeout: BridgeError = ChannelError::Timeout {
            timeout: Duration::from_millis(250),
        }
        .into();
        assert!(matches!(timeout, BridgeError::UpstreamTimeout { timeout_ms: 250 }));

        let violation: BridgeError = ChannelError::ProtocolViolation("id".into()).into();
        assert_eq!(violation.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_envelope_carries_detail_in_data() {
        let response = BridgeError::ProtocolViolation("reply id 4 does not match".into())
            .into_envelope(Some(7));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["id"], 7);
        assert_eq!(body["error"]["code"], 502);
        assert_eq!(body["error"]["message"], "Bad Gateway");
        assert_eq!(
            body["error"]["data"],
            "Bad reply from model server: reply id 4 does not match"
        );
    }

    #[test]
    fn test_validation_summaries_use_jsonrpc_names() {
        assert_eq!(BridgeError::ParseError("x".into()).summary(), "Parse error");
        assert_eq!(
            BridgeError::InvalidIds(ParseError::EmptyArgument).summary(),
            "Invalid params"
        );
        assert_eq!(BridgeError::NotAcceptable.summary(), "Not Acceptable");
        assert_eq!(
            BridgeError::UpstreamTimeout { timeout_ms: 1 }.summary(),
            "Gateway Timeout"
        );
    }

    #[test]
    fn test_messages_are_not_empty() {
        assert_eq!(BridgeError::NotAcceptable.to_string(), "Not Acceptable");
        assert_eq!(
            BridgeError::InvalidIds(ParseError::EmptyArgument).to_string(),
            "Usernames must not be empty"
        );
    }
}

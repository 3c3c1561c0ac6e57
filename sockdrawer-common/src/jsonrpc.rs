//! JSON-RPC 2.0 envelope types
//!
//! Used on both sides of the bridge: for the outward HTTP responses and for
//! the request/reply frames exchanged with the scoring service.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version string carried in every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Largest integer a standard JSON number (IEEE 754 double) holds exactly
pub const MAX_JSON_INT: i64 = (1 << 53) - 1;

/// Smallest integer a standard JSON number holds exactly
pub const MIN_JSON_INT: i64 = -MAX_JSON_INT;

/// Invalid JSON was received
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters
pub const INVALID_PARAMS: i64 = -32602;

/// Draw a fresh correlation ID from `[MIN_JSON_INT, MAX_JSON_INT]`
pub fn random_correlation_id() -> i64 {
    rand::thread_rng().gen_range(MIN_JSON_INT..=MAX_JSON_INT)
}

/// Whether `id` survives a round trip through a standard JSON number
pub fn is_json_safe_id(id: i64) -> bool {
    (MIN_JSON_INT..=MAX_JSON_INT).contains(&id)
}

/// A JSON-RPC call object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest<P> {
    pub jsonrpc: String,
    pub id: i64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<P>,
}

impl<P> RpcRequest<P> {
    pub fn new(id: i64, method: impl Into<String>, params: Option<P>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: i64, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// A JSON-RPC response object
///
/// Exactly one of `result` and `error` is set when built through
/// [`RpcResponse::success`] or [`RpcResponse::failure`]. `id` is `None`
/// (serialized as `null`) when the request id could not be determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    pub jsonrpc: String,
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl<T> RpcResponse<T> {
    pub fn success(id: i64, result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<i64>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

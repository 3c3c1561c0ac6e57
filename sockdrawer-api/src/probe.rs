//! End-to-end health probe
//!
//! Issues a real guess request against a running service and checks the
//! answer is a successful JSON-RPC 2.0 response. Used by the
//! `sockdrawer-healthcheck` binary.

use serde_json::Value;
use sockdrawer_common::jsonrpc::JSONRPC_VERSION;
use thiserror::Error;

use crate::guess::Verdict;

/// Accounts queried when none are given
pub const DEFAULT_PROBE_IDS: &str = "kennethreitz,gvanrossum";

/// Probe failures
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is not valid JSON-RPC 2.0")]
    NotJsonRpc,

    #[error("response was an error: {0}")]
    RpcError(Value),

    #[error("unexpected result shape: {0}")]
    BadResult(String),
}

/// GET `{base_url}/api/1/user?ids=<ids>` and validate the envelope
pub async fn probe(
    client: &reqwest::Client,
    base_url: &str,
    ids: &str,
) -> Result<Vec<Verdict>, ProbeError> {
    let url = format!("{}/api/1/user", base_url.trim_end_matches('/'));

    let response = client
        .get(&url)
        .header(reqwest::header::ACCEPT, "application/json")
        .query(&[("ids", ids)])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProbeError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let body: Value = response.json().await?;

    if body.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(ProbeError::NotJsonRpc);
    }

    if let Some(error) = body.get("error") {
        return Err(ProbeError::RpcError(error.clone()));
    }

    let result = body.get("result").cloned().ok_or(ProbeError::NotJsonRpc)?;
    serde_json::from_value(result).map_err(|e| ProbeError::BadResult(e.to_string()))
}

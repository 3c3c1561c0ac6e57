//! Preflight checks for guess requests
//!
//! Run before any handler work, in this order, each a short-circuit:
//! 1. content negotiation: an Accept header that rules out JSON → 406
//! 2. size policy: a request URL longer than `max_url_length` → 414
//!
//! Identifier parsing and upstream calls never start for a request
//! rejected here.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::BridgeError;
use crate::AppState;

/// Preflight middleware for the guess routes
pub async fn preflight(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, BridgeError> {
    if !accepts_json(request.headers()) {
        warn!("Rejecting request whose Accept header excludes JSON");
        return Err(BridgeError::NotAcceptable);
    }

    let length = request_url_length(&request);
    let max = state.config.max_url_length;
    if length > max {
        warn!("Rejecting {} byte request URL (limit {})", length, max);
        return Err(BridgeError::RequestTooLong { length, max });
    }

    Ok(next.run(request).await)
}

/// Whether the Accept header(s) admit `application/json`
///
/// No header (or only blank ones) means anything is acceptable. Otherwise
/// the most specific media range matching `application/json` decides:
/// `application/json` over `application/*` over `*/*`. A matching range with
/// `q=0` rules JSON out.
pub fn accepts_json(headers: &HeaderMap) -> bool {
    let values: Vec<&str> = headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .collect();

    if values.is_empty() {
        return true;
    }

    // (specificity, q) of the best matching range so far
    let mut best: Option<(u8, f32)> = None;

    for range in values.iter().flat_map(|v| v.split(',')) {
        let mut parts = range.split(';');
        let media_type = parts.next().unwrap_or("").trim().to_ascii_lowercase();

        let specificity = match media_type.as_str() {
            "application/json" => 3,
            "application/*" => 2,
            "*/*" => 1,
            _ => continue,
        };

        let mut q = 1.0_f32;
        for param in parts {
            if let Some((name, value)) = param.split_once('=') {
                if name.trim().eq_ignore_ascii_case("q") {
                    q = value.trim().parse().unwrap_or(0.0);
                }
            }
        }

        match best {
            Some((s, _)) if s > specificity => {}
            Some((s, best_q)) if s == specificity => best = Some((s, best_q.max(q))),
            _ => best = Some((specificity, q)),
        }
    }

    matches!(best, Some((_, q)) if q > 0.0)
}

/// Length of the full request URL: scheme, host, path and query
pub fn request_url_length(request: &Request) -> usize {
    let uri = request.uri();
    if uri.scheme().is_some() {
        return uri.to_string().len();
    }

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    "http://".len() + host.len() + path_and_query.len()
}

//! User guess endpoints
//!
//! - `GET /api/1/user?ids=<comma-separated>`
//! - `POST /api/1/user` with `{"jsonrpc":"2.0","id":N,"method":"guess","params":{"ids":[...]}}`
//!
//! Both answer with the same JSON-RPC envelope. GET responses carry a fresh
//! correlation ID; POST responses echo the caller's `id`, or `null` when the
//! body was unusable before an id could be read.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use sockdrawer_common::jsonrpc::{
    is_json_safe_id, random_correlation_id, RpcResponse, JSONRPC_VERSION,
};
use tracing::{info, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::guess::Verdict;
use crate::identifiers::{parse_id, parse_ids, Identifier, ParseError};
use crate::AppState;

/// The only method served over POST
pub const GUESS_METHOD: &str = "guess";

/// Outcome of a guess request, paired with its response id
#[derive(Debug)]
pub struct GuessResponse {
    pub id: Option<i64>,
    pub outcome: BridgeResult<Vec<Verdict>>,
}

impl IntoResponse for GuessResponse {
    fn into_response(self) -> Response {
        match (self.outcome, self.id) {
            (Ok(verdicts), Some(id)) => {
                (StatusCode::OK, Json(RpcResponse::success(id, verdicts))).into_response()
            }
            (Ok(verdicts), None) => {
                let body = RpcResponse::success(random_correlation_id(), verdicts);
                (StatusCode::OK, Json(body)).into_response()
            }
            (Err(e), id) => e.into_envelope(id),
        }
    }
}

/// Routes for the guess endpoint, behind the preflight checks
pub fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/user",
            get(get_user)
                .post(post_user)
                .fallback(super::method_not_allowed),
        )
        .route_layer(middleware::from_fn_with_state(state, super::preflight))
}

/// GET /api/1/user?ids=...
pub async fn get_user(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> GuessResponse {
    let response_id = random_correlation_id();

    let ids = match query
        .map_err(|e| BridgeError::InvalidParams(e.body_text()))
        .and_then(|Query(pairs)| ids_from_query(pairs))
    {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Rejected GET request: {}", e);
            return GuessResponse {
                id: Some(response_id),
                outcome: Err(e),
            };
        }
    };

    info!("Received GET request for {:?}", ids);
    let outcome = state.orchestrator().guess_all(&ids).await;
    info!("Done");

    GuessResponse {
        id: Some(response_id),
        outcome,
    }
}

/// POST /api/1/user
pub async fn post_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> GuessResponse {
    if let Err(e) = require_json_content(&headers) {
        warn!("Rejected POST request: {}", e);
        return GuessResponse {
            id: Some(random_correlation_id()),
            outcome: Err(e),
        };
    }

    let (request_id, ids) = match parse_guess_call(&body) {
        Ok(call) => call,
        Err((id, e)) => {
            warn!("Rejected POST request: {}", e);
            return GuessResponse {
                id,
                outcome: Err(e),
            };
        }
    };

    info!("Received POST request {} for {:?}", request_id, ids);
    let outcome = state.orchestrator().guess_all(&ids).await;
    info!("Done");

    GuessResponse {
        id: Some(request_id),
        outcome,
    }
}

/// Extract identifiers from GET query pairs
///
/// `ids` must appear exactly once; any other parameter is rejected.
pub fn ids_from_query(pairs: Vec<(String, String)>) -> BridgeResult<Vec<Identifier>> {
    let mut raw_ids: Option<String> = None;

    for (key, value) in pairs {
        if key != "ids" {
            return Err(BridgeError::InvalidParams(format!("unknown parameter {:?}", key)));
        }
        if raw_ids.replace(value).is_some() {
            return Err(BridgeError::InvalidParams(
                "ids must be given exactly once".to_string(),
            ));
        }
    }

    Ok(parse_ids(raw_ids.as_deref())?)
}

fn require_json_content(headers: &HeaderMap) -> BridgeResult<()> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let essence = content_type.split(';').next().unwrap_or("").trim();
    if essence.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else if essence.is_empty() {
        Err(BridgeError::UnsupportedMediaType(
            "missing Content-Type, expected application/json".to_string(),
        ))
    } else {
        Err(BridgeError::UnsupportedMediaType(format!(
            "{}, expected application/json",
            essence
        )))
    }
}

/// Validate a JSON-RPC guess call, returning its id and identifiers
///
/// Errors carry the response id to use: `None` until the request id has
/// been read successfully.
pub fn parse_guess_call(
    body: &[u8],
) -> Result<(i64, Vec<Identifier>), (Option<i64>, BridgeError)> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| (None::<i64>, BridgeError::ParseError(e.to_string())))?;

    let invalid = |msg: &str| -> (Option<i64>, BridgeError) {
        (None, BridgeError::InvalidRequest(msg.to_string()))
    };

    let call = value
        .as_object()
        .ok_or_else(|| invalid("request must be a JSON object"))?;

    if call.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(invalid("jsonrpc must be \"2.0\""));
    }

    let id = call
        .get("id")
        .and_then(Value::as_i64)
        .filter(|id| is_json_safe_id(*id))
        .ok_or_else(|| invalid("id must be an integer within +/-(2^53-1)"))?;

    let method = call
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("method must be a string"))?;

    if method != GUESS_METHOD {
        return Err((Some(id), BridgeError::MethodNotFound(method.to_string())));
    }

    let raw_ids = call
        .get("params")
        .and_then(|params| params.get("ids"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            (
                Some(id),
                BridgeError::InvalidParams("params.ids must be an array".to_string()),
            )
        })?;

    if raw_ids.is_empty() {
        return Err((Some(id), ParseError::EmptyArgument.into()));
    }

    let ids = raw_ids
        .iter()
        .map(|raw| match raw.as_str() {
            Some(segment) => parse_id(segment).map_err(BridgeError::from),
            None => Err(BridgeError::InvalidParams(format!(
                "params.ids entries must be strings, got {}",
                raw
            ))),
        })
        .collect::<BridgeResult<Vec<Identifier>>>()
        .map_err(|e| (Some(id), e))?;

    Ok((id, ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_query_with_ids() {
        let ids = ids_from_query(pairs(&[("ids", "18105480,JesseT_G")])).unwrap();
        assert_eq!(
            ids,
            vec![
                Identifier::Numeric(18105480),
                Identifier::Handle("JesseT_G".to_string())
            ]
        );
    }

    #[test]
    fn test_query_rejects_unknown_and_repeated() {
        assert!(matches!(
            ids_from_query(pairs(&[("ids", "a"), ("unknown_parameter", "")])),
            Err(BridgeError::InvalidParams(_))
        ));
        assert!(matches!(
            ids_from_query(pairs(&[("ids", "a"), ("ids", "b")])),
            Err(BridgeError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_query_without_ids_is_empty_argument() {
        assert!(matches!(
            ids_from_query(Vec::new()),
            Err(BridgeError::InvalidIds(ParseError::EmptyArgument))
        ));
        assert!(matches!(
            ids_from_query(pairs(&[("ids", "")])),
            Err(BridgeError::InvalidIds(ParseError::EmptyArgument))
        ));
    }

    #[test]
    fn test_guess_call_ok() {
        let body = br#"{"jsonrpc":"2.0","id":689,"method":"guess","params":{"ids":["JesseT_G","@2048"]}}"#;
        let (id, ids) = parse_guess_call(body).unwrap();
        assert_eq!(id, 689);
        assert_eq!(
            ids,
            vec![
                Identifier::Handle("JesseT_G".to_string()),
                Identifier::Handle("2048".to_string())
            ]
        );
    }

    #[test]
    fn test_garbage_body_is_parse_error_with_null_id() {
        let (id, e) = parse_guess_call(b"sdaafrrrfgtyfe").unwrap_err();
        assert_eq!(id, None);
        assert!(matches!(e, BridgeError::ParseError(_)));
    }

    #[test]
    fn test_invalid_requests() {
        let cases: [&[u8]; 6] = [
            br#"[1, 2]"#,
            br#"{"id":1,"method":"guess","params":{"ids":["a"]}}"#,
            br#"{"jsonrpc":"2.0","method":"guess","params":{"ids":["a"]}}"#,
            br#"{"jsonrpc":"2.0","id":"abc","method":"guess","params":{"ids":["a"]}}"#,
            br#"{"jsonrpc":"2.0","id":9007199254740992,"method":"guess","params":{"ids":["a"]}}"#,
            br#"{"jsonrpc":"2.0","id":1,"params":{"ids":["a"]}}"#,
        ];
        for body in cases {
            let (id, e) = parse_guess_call(body).unwrap_err();
            assert_eq!(id, None);
            assert!(matches!(e, BridgeError::InvalidRequest(_)), "{:?}", e);
        }
    }

    #[test]
    fn test_unknown_method_keeps_id() {
        let body = br#"{"jsonrpc":"2.0","id":3,"method":"train","params":{"ids":["a"]}}"#;
        let (id, e) = parse_guess_call(body).unwrap_err();
        assert_eq!(id, Some(3));
        assert!(matches!(e, BridgeError::MethodNotFound(_)));
    }

    #[test]
    fn test_bad_params() {
        let cases: [&[u8]; 4] = [
            br#"{"jsonrpc":"2.0","id":3,"method":"guess"}"#,
            br#"{"jsonrpc":"2.0","id":3,"method":"guess","params":{"ids":[]}}"#,
            br#"{"jsonrpc":"2.0","id":3,"method":"guess","params":{"ids":[42]}}"#,
            br#"{"jsonrpc":"2.0","id":3,"method":"guess","params":{"ids":["a",""]}}"#,
        ];
        for body in cases {
            let (id, e) = parse_guess_call(body).unwrap_err();
            assert_eq!(id, Some(3));
            assert_eq!(e.status(), StatusCode::BAD_REQUEST, "{:?}", e);
        }
    }

    #[test]
    fn test_content_type_check() {
        let mut headers = HeaderMap::new();
        assert!(require_json_content(&headers).is_err());

        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(require_json_content(&headers).is_err());

        headers.insert(
            header::CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );
        assert!(require_json_content(&headers).is_ok());
    }
}

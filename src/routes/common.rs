//! Shared helpers for route handlers: responses, bodies, queries and auth

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::auth::{extract_token_from_header, Actor};
use crate::server::AppState;
use crate::types::{Result, WildwatchError};

pub type FullBody = Full<Bytes>;

/// Largest request body accepted by any endpoint
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl From<&WildwatchError> for ErrorResponse {
    fn from(err: &WildwatchError) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

pub fn error_response(err: &WildwatchError) -> Response<FullBody> {
    json_response(err.status_code(), &ErrorResponse::from(err))
}

/// Render a handler outcome: the value with `status`, or the error body
pub fn respond<T: Serialize>(status: StatusCode, result: Result<T>) -> Response<FullBody> {
    match result {
        Ok(body) => json_response(status, &body),
        Err(err) => {
            debug!(kind = err.kind(), "Request failed: {}", err);
            error_response(&err)
        }
    }
}

pub fn no_route(path: &str) -> WildwatchError {
    WildwatchError::NotFound(format!("no route for {}", path))
}

pub fn method_not_allowed(method: &Method, path: &str) -> WildwatchError {
    WildwatchError::NotFound(format!("{} is not supported on {}", method, path))
}

// =============================================================================
// Request Helpers
// =============================================================================

pub fn get_auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Verify the bearer token and resolve the caller against the directory
pub async fn authenticate(req: &Request<Incoming>, state: &AppState) -> Result<Actor> {
    let token = extract_token_from_header(get_auth_header(req))
        .ok_or_else(|| WildwatchError::Unauthorized("missing bearer token".into()))?;
    let claims = state.jwt.verify_token(token).into_result()?;
    state.engine.directory.resolve_actor(&claims).await
}

/// Collect and parse a JSON body. An empty body parses as `{}`.
pub async fn read_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T> {
    parse_json_body(req.into_body()).await
}

/// Reading stops as soon as the body passes `MAX_BODY_BYTES`
pub async fn parse_json_body<T, B>(body: B) -> Result<T>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            return Err(WildwatchError::Validation(format!(
                "request body exceeds {} bytes",
                MAX_BODY_BYTES
            )))
        }
        Err(e) => return Err(WildwatchError::Internal(format!("reading body: {}", e))),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"{}")?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decoded `key=value` pairs of a query string, empty values dropped
pub fn query_params(query: Option<&str>) -> Vec<(String, String)> {
    query
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter_map(|(key, value)| {
            let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
            (!value.is_empty()).then(|| (key.to_string(), value))
        })
        .collect()
}

pub fn query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// `true`/`1` are true, anything else false
pub fn query_flag(params: &[(String, String)], key: &str) -> bool {
    matches!(query_value(params, key), Some("true") | Some("1"))
}

/// Split `/prefix/{id}/rest` into `(id, rest)`; `rest` is empty for `/prefix/{id}`
pub fn split_id<'a>(path: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    let tail = path.strip_prefix(prefix)?.strip_prefix('/')?;
    let (id, rest) = tail.split_once('/').unwrap_or((tail, ""));
    (!id.is_empty()).then_some((id, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_response_body() {
        let err = WildwatchError::ConcurrentModification("case CASE-1 changed".into());
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "CONCURRENT_MODIFICATION");
        assert_eq!(body["retryable"], true);
        assert!(body["message"].as_str().unwrap().contains("CASE-1"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let body = Full::new(Bytes::from(vec![b' '; MAX_BODY_BYTES + 1]));
        let result = parse_json_body::<serde_json::Value, _>(body).await;
        assert!(matches!(result, Err(WildwatchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_body_parsing() {
        let empty: serde_json::Value = parse_json_body(Full::new(Bytes::new())).await.unwrap();
        assert_eq!(empty, serde_json::json!({}));

        let body = Full::new(Bytes::from_static(br#"{"role":"OFFICER"}"#));
        let value: serde_json::Value = parse_json_body(body).await.unwrap();
        assert_eq!(value["role"], "OFFICER");

        let broken = Full::new(Bytes::from_static(b"{not json"));
        assert!(matches!(
            parse_json_body::<serde_json::Value, _>(broken).await,
            Err(WildwatchError::Validation(_))
        ));
    }

    #[test]
    fn test_query_params() {
        let params = query_params(Some("unreadOnly=true&limit=5&search=elephant+tusk&empty="));
        assert!(query_flag(&params, "unreadOnly"));
        assert_eq!(query_value(&params, "limit"), Some("5"));
        assert_eq!(query_value(&params, "search"), Some("elephant tusk"));
        assert_eq!(query_value(&params, "empty"), None);
        assert!(!query_flag(&params, "mine"));
    }

    #[test]
    fn test_split_id() {
        assert_eq!(split_id("/cases/C1", "/cases"), Some(("C1", "")));
        assert_eq!(split_id("/cases/C1/assign", "/cases"), Some(("C1", "assign")));
        assert_eq!(split_id("/cases/", "/cases"), None);
        assert_eq!(split_id("/casesX/C1", "/cases"), None);
    }
}

//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Every request runs
//! under the configured timeout; an expired request answers 503.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{Actor, JwtValidator};
use crate::config::Args;
use crate::routes::{self, FullBody};
use crate::services::Engine;
use crate::types::{Result, WildwatchError};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub engine: Engine,
    /// Verifies session tokens issued by the external session layer
    pub jwt: JwtValidator,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, engine: Engine, jwt: JwtValidator) -> Self {
        Self {
            args,
            engine,
            jwt,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Wildwatch listening on {} as node {} (store: {})",
        state.args.listen,
        state.args.node_id,
        state.engine.stores().backend
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - dev token secret and permissive media checks");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(to_boxed(preflight_response()));
    }

    let timeout = state.args.request_timeout();
    let mut response = match tokio::time::timeout(timeout, route(&state, req)).await {
        Ok(response) => response,
        Err(_) => {
            warn!("[{}] {} {} timed out after {:?}", addr, method, path, timeout);
            routes::error_response(&WildwatchError::DependencyUnavailable(format!(
                "request did not complete within {} ms",
                timeout.as_millis()
            )))
        }
    };
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

    Ok(to_boxed(response))
}

async fn route(state: &AppState, req: Request<Incoming>) -> Response<FullBody> {
    let path = req.uri().path().to_string();

    match (req.method(), path.as_str()) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return routes::health_check(state)
        }
        (&Method::GET, "/ready") | (&Method::GET, "/readyz") => {
            return routes::readiness_check(state).await
        }
        (&Method::GET, "/version") => return routes::version_info(),
        _ => {}
    }

    let Some(area) = Area::of(&path) else {
        return not_found_response(&path);
    };

    let actor: Actor = match routes::authenticate(&req, state).await {
        Ok(actor) => actor,
        Err(err) => return routes::error_response(&err),
    };

    match area {
        Area::Reports => routes::handle_reports_request(req, state, &actor).await,
        Area::Cases => routes::handle_cases_request(req, state, &actor).await,
        Area::Notifications => routes::handle_notifications_request(req, state, &actor).await,
        Area::Staff => routes::handle_staff_request(req, state, &actor).await,
        Area::Users => routes::handle_users_request(req, state, &actor).await,
    }
}

/// Authenticated route families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Area {
    Reports,
    Cases,
    Notifications,
    Staff,
    Users,
}

impl Area {
    fn of(path: &str) -> Option<Self> {
        let first = path.trim_start_matches('/').split('/').next()?;
        match first {
            "reports" => Some(Area::Reports),
            "cases" => Some(Area::Cases),
            "notifications" => Some(Area::Notifications),
            "staff" => Some(Area::Staff),
            "users" => Some(Area::Users),
            _ => None,
        }
    }
}

/// Convert `Full<Bytes>` response to `BoxBody` response
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Authorization, Content-Type"),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
    );
    response
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    routes::json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "NOT_FOUND",
            "message": format!("no route for {}", path),
            "retryable": false,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_routing() {
        assert_eq!(Area::of("/cases/stats/overview"), Some(Area::Cases));
        assert_eq!(Area::of("/reports"), Some(Area::Reports));
        assert_eq!(Area::of("/notifications/unread-count"), Some(Area::Notifications));
        assert_eq!(Area::of("/users/u1/role"), Some(Area::Users));
        assert_eq!(Area::of("/casework"), None);
        assert_eq!(Area::of("/"), None);
    }

    #[test]
    fn test_preflight_allows_patch() {
        let response = preflight_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let methods = response
            .headers()
            .get("Access-Control-Allow-Methods")
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(methods.contains("PATCH"));
        assert!(methods.contains("DELETE"));
    }
}

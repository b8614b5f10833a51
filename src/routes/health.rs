//! Health check endpoints
//!
//! - /health, /healthz - Liveness probe (is the service running?)
//! - /ready, /readyz - Readiness probe (can the store answer?)
//! - /version - Build information

use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::warn;

use super::common::{json_response, FullBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
    /// "development" or "production"
    pub mode: &'static str,
    #[serde(rename = "nodeId")]
    pub node_id: String,
    /// Store backend in use
    pub store: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

pub fn health_check(state: &AppState) -> Response<FullBody> {
    let response = HealthResponse {
        healthy: true,
        status: "online",
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        node_id: state.args.node_id.to_string(),
        store: state.engine.stores().backend,
    };
    json_response(StatusCode::OK, &response)
}

/// 200 once the store answers a ping, 503 otherwise
pub async fn readiness_check(state: &AppState) -> Response<FullBody> {
    let stores = state.engine.stores();
    match stores.directory.ping().await {
        Ok(()) => json_response(
            StatusCode::OK,
            &ReadyResponse {
                ready: true,
                store: stores.backend,
                error: None,
            },
        ),
        Err(err) => {
            warn!("Readiness check failed: {}", err);
            json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ReadyResponse {
                    ready: false,
                    store: stores.backend,
                    error: Some(err.to_string()),
                },
            )
        }
    }
}

pub fn version_info() -> Response<FullBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

//! Error types for Wildwatch
//!
//! Every engine operation fails with one of these kinds. The HTTP layer
//! renders them with a stable machine-readable `error` field.

use hyper::StatusCode;

use crate::domain::CaseStatus;

/// Main error type for Wildwatch operations
#[derive(Debug, thiserror::Error)]
pub enum WildwatchError {
    /// Malformed or missing input. The caller can fix it and resend.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation is not legal in the entity's current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: CaseStatus,
        to: CaseStatus,
        reason: String,
    },

    /// Review of a report that is no longer pending
    #[error("Invalid report transition: {0}")]
    InvalidReportTransition(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Lost a race against another writer on the same entity
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    /// External collaborator (database, media storage, session layer) failed
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WildwatchError {
    /// Stable machine-readable kind for response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::InvalidTransition { .. } | Self::InvalidReportTransition(_) => {
                "INVALID_TRANSITION"
            }
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::DependencyUnavailable(_) => "DEPENDENCY_UNAVAILABLE",
            Self::Config(_) | Self::Internal(_) => "INTERNAL",
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidState(_)
            | Self::InvalidTransition { .. }
            | Self::InvalidReportTransition(_)
            | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a client may resend the same request unmodified
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification(_) | Self::DependencyUnavailable(_)
        )
    }

    pub(crate) fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound(format!("{} {} does not exist", entity, id))
    }
}

impl From<std::io::Error> for WildwatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for WildwatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for WildwatchError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for WildwatchError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::DependencyUnavailable(format!("database: {}", err))
    }
}

impl From<bson::ser::Error> for WildwatchError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encoding: {}", err))
    }
}

impl From<reqwest::Error> for WildwatchError {
    fn from(err: reqwest::Error) -> Self {
        Self::DependencyUnavailable(format!("media storage: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for WildwatchError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for Wildwatch operations
pub type Result<T> = std::result::Result<T, WildwatchError>;

//! Configuration for Wildwatch
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Which store backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Memory,
    Mongo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Wildwatch - wildlife threat case management service
#[derive(Parser, Debug, Clone)]
#[command(name = "wildwatch")]
#[command(about = "Case and investigation lifecycle engine for wildlife threat reports")]
pub struct Args {
    /// Unique node identifier, recorded in the audit log
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (dev JWT secret, permissive media, in-memory fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Store backend
    #[arg(long, env = "STORE", value_enum, default_value = "mongo")]
    pub store: StoreBackend,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "wildwatch")]
    pub mongodb_db: String,

    /// Shared secret used to verify session tokens (HS256)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Upper bound on the handling time of a single request
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Media storage base URL; evidence URLs are confirmed against it
    #[arg(long, env = "STORAGE_URL")]
    pub storage_url: Option<String>,

    /// Polling interval advertised to clients for the unread count
    #[arg(long, env = "UNREAD_REFRESH_SECS", default_value = "30")]
    pub unread_refresh_secs: u64,

    /// JSONL audit log path (disabled when unset)
    #[arg(long, env = "AUDIT_LOG_PATH")]
    pub audit_log_path: Option<PathBuf>,
}

impl Args {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match self.jwt_secret.as_deref() {
                None | Some("") => {
                    return Err("JWT_SECRET is required in production mode".to_string())
                }
                Some(s) if s.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                _ => {}
            }
            if self.storage_url.is_none() {
                return Err("STORAGE_URL is required in production mode".to_string());
            }
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.unread_refresh_secs == 0 {
            return Err("UNREAD_REFRESH_SECS must be greater than zero".to_string());
        }

        if let Some(ref url) = self.storage_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err("STORAGE_URL must be an http(s) URL".to_string());
            }
        }

        Ok(())
    }
}

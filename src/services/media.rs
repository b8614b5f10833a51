//! Media storage collaborator
//!
//! Evidence only records references to media that the storage service
//! already holds. Uploading is the client's business; before an evidence
//! entry is appended the URL is confirmed here.

use async_trait::async_trait;
use dashmap::DashSet;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{Result, WildwatchError};

#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// `Ok(true)` when `url` names stored media, `Ok(false)` when storage
    /// does not know it, `DependencyUnavailable` when storage cannot answer.
    async fn resolve(&self, url: &str) -> Result<bool>;
}

/// Configuration for the HTTP media resolver
#[derive(Debug, Clone)]
pub struct HttpMediaResolverConfig {
    /// Base URL of the storage service; evidence URLs must live under it
    pub storage_url: String,
    /// Timeout for probe requests (default: 5 seconds)
    pub request_timeout: Duration,
}

impl HttpMediaResolverConfig {
    pub fn new(storage_url: impl Into<String>) -> Self {
        Self {
            storage_url: storage_url.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Confirms media with a HEAD request against the storage service
pub struct HttpMediaResolver {
    config: HttpMediaResolverConfig,
    http_client: reqwest::Client,
}

impl HttpMediaResolver {
    pub fn new(config: HttpMediaResolverConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent("wildwatch/0.1")
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }

    fn is_under_storage(&self, url: &str) -> bool {
        url.strip_prefix(&self.config.storage_url)
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }
}

#[async_trait]
impl MediaResolver for HttpMediaResolver {
    async fn resolve(&self, url: &str) -> Result<bool> {
        if !self.is_under_storage(url) {
            debug!(url = %url, "Evidence URL is outside media storage");
            return Ok(false);
        }

        let response = self.http_client.head(url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            warn!(url = %url, status = %status, "Media storage probe failed");
            Err(WildwatchError::DependencyUnavailable(format!(
                "media storage answered {} for {}",
                status, url
            )))
        }
    }
}

/// In-process catalog of known media, for dev mode and tests
#[derive(Default)]
pub struct MemoryMediaCatalog {
    known: DashSet<String>,
    /// Accept any http(s) URL
    permissive: bool,
}

impl MemoryMediaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permissive() -> Self {
        Self {
            known: DashSet::new(),
            permissive: true,
        }
    }

    pub fn register(&self, url: impl Into<String>) {
        self.known.insert(url.into());
    }
}

#[async_trait]
impl MediaResolver for MemoryMediaCatalog {
    async fn resolve(&self, url: &str) -> Result<bool> {
        if self.known.contains(url) {
            return Ok(true);
        }
        Ok(self.permissive && (url.starts_with("https://") || url.starts_with("http://")))
    }
}

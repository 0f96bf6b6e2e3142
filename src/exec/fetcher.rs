//! Network fetcher for installer scripts and binary downloads.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{BootstrapError, Result};

/// Abstracts HTTPS downloads for testability.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Download `url` and return the response body.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("crisp-bootstrap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "Fetching");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BootstrapError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BootstrapError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| BootstrapError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

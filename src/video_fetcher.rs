//! HTTP retrieval of alert video clips from the video server.

use crate::config::VideoServerConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors that can occur while fetching a video
#[derive(Debug, Error)]
pub enum FetchError {
    /// The video server could not be reached (connection, DNS, timeout) or
    /// answered with a server-side failure.
    #[error("Video server not reachable: {0}")]
    ServerUnreachable(String),

    /// The video server answered, but does not have the requested clip.
    #[error("Video not found on server: {0}")]
    NotFound(String),
}

/// Retrieves raw video bytes for an alert's video reference
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    /// Fetch the full byte content of the video at `video_path`, relative to
    /// the configured video server base address.
    async fn fetch(&self, video_path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Video fetcher backed by an HTTP client
pub struct HttpVideoFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVideoFetcher {
    /// Create a new fetcher for the configured video server
    pub fn new(config: &VideoServerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn video_url(&self, video_path: &str) -> String {
        format!("{}{}", self.base_url, video_path)
    }
}

#[async_trait]
impl VideoFetcher for HttpVideoFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, video_path: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.video_url(video_path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::ServerUnreachable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(FetchError::NotFound(video_path.to_string()));
        }
        if status.is_server_error() {
            return Err(FetchError::ServerUnreachable(format!(
                "video server returned {status}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::ServerUnreachable(e.to_string()))?;

        debug!(url = %url, size_bytes = bytes.len(), "Video fetched");

        Ok(bytes.to_vec())
    }
}

//! Read-only remote feedback snapshots.
//!
//! A remote source is any URL that returns the same JSON an export or a
//! bare record array contains. Snapshots are fetched once per load and never
//! written back.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CACHE_CONTROL};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::FeedbackRecord;
use crate::transfer;

/// Default `User-Agent` for remote fetches.
pub const DEFAULT_USER_AGENT: &str = concat!("dailyfeedback/", env!("CARGO_PKG_VERSION"));

/// Something that can produce a feedback snapshot for a URL.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch and decode the snapshot at `url`.
    ///
    /// # Errors
    ///
    /// Every failure is reported as [`Error::RemoteLoad`].
    async fn fetch(&self, url: &str) -> Result<Vec<FeedbackRecord>>;
}

/// HTTP(S) snapshot loader.
#[derive(Debug, Clone)]
pub struct HttpRemoteSource {
    client: reqwest::Client,
}

impl HttpRemoteSource {
    /// Create a loader that identifies itself with `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedbackRecord>> {
        debug!(url, "Fetching remote snapshot");

        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .send()
            .await
            .map_err(|e| Error::remote_load(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::remote_load(url, format!("HTTP {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::remote_load(url, e.to_string()))?;

        let records =
            transfer::records_from_value(body).map_err(|e| Error::remote_load(url, e.to_string()))?;

        info!(url, count = records.len(), "Loaded remote snapshot");
        Ok(records)
    }
}

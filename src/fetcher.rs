//! History and latest-candle requests.
//!
//! Both endpoints return raw binary bodies (no JSON envelope) that go
//! straight through [`crate::codec::decode_candles`]. The public fetch
//! methods never fail: an upstream with "no data yet" and an upstream that
//! is down both produce an empty result, and the fault is logged.

use tracing::{debug, error, info};

use crate::Result;
use crate::codec::decode_candles;
use crate::config::HttpConfig;
use crate::models::Candle;

/// Client for the two candle endpoints.
#[derive(Debug, Clone)]
pub struct CandleFetcher {
    client: reqwest::Client,
    history_url: String,
    latest_url: String,
}

impl CandleFetcher {
    /// Builds a fetcher with one pooled HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`](crate::FeedError::Http) if the HTTP client
    /// cannot be constructed.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let base = config.base_url.trim_end_matches('/');

        Ok(Self {
            client,
            history_url: format!("{base}{}", config.history_path),
            latest_url: format!("{base}{}", config.latest_path),
        })
    }

    /// Fetches the bulk candle history.
    ///
    /// Empty bodies, transport failures, non-success statuses and malformed
    /// bodies all yield an empty vector.
    pub async fn fetch_history(&self) -> Vec<Candle> {
        match self.try_fetch_history().await {
            Ok(candles) => candles,
            Err(e) => {
                error!(url = %self.history_url, "Failed to fetch candle history: {e}");
                Vec::new()
            }
        }
    }

    /// Fetches the most recent candle, or `None` if there is none yet or the
    /// request failed.
    pub async fn fetch_latest(&self) -> Option<Candle> {
        match self.try_fetch_latest().await {
            Ok(candle) => candle,
            Err(e) => {
                error!(url = %self.latest_url, "Failed to fetch latest candle: {e}");
                None
            }
        }
    }

    /// Like [`fetch_history`](Self::fetch_history) but surfaces the fault.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`](crate::FeedError::Http) on transport
    /// failure or non-success status, and
    /// [`FeedError::Format`](crate::FeedError::Format) on a malformed body.
    pub async fn try_fetch_history(&self) -> Result<Vec<Candle>> {
        let body = self.get_bytes(&self.history_url).await?;
        if body.is_empty() {
            info!("History endpoint returned no data");
            return Ok(Vec::new());
        }

        let candles = decode_candles(&body)?;
        info!(records = candles.len(), "Received candle history");
        Ok(candles)
    }

    /// Like [`fetch_latest`](Self::fetch_latest) but surfaces the fault.
    ///
    /// Only the first record is returned; the endpoint sends at most one.
    ///
    /// # Errors
    ///
    /// See [`try_fetch_history`](Self::try_fetch_history).
    pub async fn try_fetch_latest(&self) -> Result<Option<Candle>> {
        let body = self.get_bytes(&self.latest_url).await?;
        if body.is_empty() {
            info!("Latest-candle endpoint returned no data");
            return Ok(None);
        }

        let candles = decode_candles(&body)?;
        debug!(records = candles.len(), "Received latest candle");
        Ok(candles.into_iter().next())
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

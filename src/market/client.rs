//! Rate-limited warframe.market client
//!
//! The market API tolerates roughly 3 requests per second. Every call takes
//! a semaphore permit and sleeps a fixed pacing delay before going out, so a
//! batch never has more than [`MAX_IN_FLIGHT`] requests outstanding and the
//! request rate stays below the limit. Batch results come back in request
//! order with per-item failures isolated; retrying is left to the next sync
//! run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;

use crate::error::{Result, SyncError};
use crate::market::models::{
    CatalogItem, DropsourcesResponse, ItemsResponse, StatisticsPayload, StatisticsResponse,
};

/// Production API root
pub const API_BASE_URL: &str = "https://api.warframe.market/v1";

/// Maximum simultaneously outstanding requests
pub const MAX_IN_FLIGHT: usize = 3;

/// Pacing delay awaited before every request, in milliseconds
pub const CALL_DELAY_MS: u64 = 700;

const USER_AGENT: &str = "relic_sync/1.0";

/// HTTP client for the warframe.market v1 API
pub struct MarketClient {
    http: reqwest::Client,
    base_url: String,
    permits: Semaphore,
    delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MarketClient {
    /// Client against the production API with the default rate budget.
    pub fn new() -> Self {
        Self::with_config(API_BASE_URL, MAX_IN_FLIGHT, Duration::from_millis(CALL_DELAY_MS))
    }

    /// Client with an explicit base URL and rate budget.
    pub fn with_config(base_url: impl Into<String>, max_in_flight: usize, delay: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            permits: Semaphore::new(max_in_flight),
            delay,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Highest number of requests that were outstanding at the same time
    /// over the lifetime of this client.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Fetch the full item catalog.
    pub async fn items(&self) -> Result<Vec<CatalogItem>> {
        let resp: ItemsResponse = self.get_json("/items").await?;
        Ok(resp.payload.items)
    }

    /// Fetch price statistics for one item.
    pub async fn statistics(&self, url_name: &str) -> Result<StatisticsPayload> {
        let path = format!("/items/{}/statistics", urlencoding::encode(url_name));
        let resp: StatisticsResponse = self.get_json(&path).await?;
        Ok(resp.payload)
    }

    /// Fetch drop sources plus set composition detail for one item.
    pub async fn dropsources_with_item(&self, url_name: &str) -> Result<DropsourcesResponse> {
        let path = format!(
            "/items/{}/dropsources?include=item",
            urlencoding::encode(url_name)
        );
        self.get_json(&path).await
    }

    /// Fetch statistics for a batch of items.
    ///
    /// Returns one result per input name, in input order. A failed request
    /// only fails its own slot.
    pub async fn fetch_all_statistics(&self, url_names: &[&str]) -> Vec<Result<StatisticsPayload>> {
        let results = join_all(url_names.iter().map(|name| self.statistics(name))).await;
        log::debug!(
            "Statistics batch done: {} requests, peak {} in flight",
            url_names.len(),
            self.peak_in_flight()
        );
        results
    }

    /// Fetch dropsources (with set detail) for a batch of items. Same
    /// ordering and failure-isolation contract as [`fetch_all_statistics`].
    ///
    /// [`fetch_all_statistics`]: MarketClient::fetch_all_statistics
    pub async fn fetch_all_dropsources(
        &self,
        url_names: &[&str],
    ) -> Vec<Result<DropsourcesResponse>> {
        let results = join_all(url_names.iter().map(|name| self.dropsources_with_item(name))).await;
        log::debug!(
            "Dropsources batch done: {} requests, peak {} in flight",
            url_names.len(),
            self.peak_in_flight()
        );
        results
    }

    /// Issue one paced GET and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("request semaphore closed");
        tokio::time::sleep(self.delay).await;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = self.request(path).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn request<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::HttpStatus(response.status()));
        }

        Ok(response.json::<T>().await?)
    }
}

impl Default for MarketClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

// src/services/snapshots.rs

//! Webpage snapshot cache.
//!
//! Fetches and caches raw page content per URL so that one URL is hit at most
//! once per run (and across runs, until explicitly cleared). Concurrent
//! callers requesting the same in-flight URL wait for and reuse the first
//! caller's result instead of fetching twice. Failed fetches are never
//! cached.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{FetcherConfig, Snapshot};
use crate::utils::http;

/// Per-URL cache slot. The slot mutex serializes fetches for one URL.
type Slot = Arc<Mutex<Option<Arc<Snapshot>>>>;

/// Cache of fetched webpage snapshots, keyed by URL.
pub struct SnapshotCache {
    client: reqwest::Client,
    entries: Mutex<HashMap<String, Slot>>,
}

impl SnapshotCache {
    /// Create a cache with a client configured from fetcher settings
    /// (user agent and per-request timeout).
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_client(config)?,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Get the snapshot for a URL, fetching it on a cache miss.
    ///
    /// `owner_name` tags the snapshot with the owning vendor's display name;
    /// it is needed later for name substitution during classification.
    /// `force_refresh` drops any cached entry for this URL first.
    pub async fn get(
        &self,
        url: &str,
        owner_name: &str,
        force_refresh: bool,
    ) -> Result<Arc<Snapshot>> {
        let slot = {
            let mut entries = self.entries.lock().await;
            if force_refresh {
                entries.remove(url);
            }
            Arc::clone(entries.entry(url.to_string()).or_default())
        };

        // Holding the slot lock across the fetch gives single-flight
        // semantics: a second caller for the same URL blocks here and then
        // sees the populated cache.
        let mut cached = slot.lock().await;
        if let Some(snapshot) = cached.as_ref() {
            log::debug!("Snapshot cache hit: {url}");
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = Arc::new(self.fetch(url, owner_name).await?);
        *cached = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Invalidate all cached entries; subsequent gets re-fetch.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
        log::debug!("Snapshot cache cleared");
    }

    async fn fetch(&self, url: &str, owner_name: &str) -> Result<Snapshot> {
        let parsed = url::Url::parse(url)?;
        log::debug!("Fetching {parsed}");
        let response = self.client.get(parsed).send().await?.error_for_status()?;
        let body = response.text().await?;
        Ok(Snapshot::single(url, owner_name, body))
    }
}

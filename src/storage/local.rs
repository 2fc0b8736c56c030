// src/storage/local.rs

//! Local filesystem vendor store.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml           # Tracker configuration
//! ├── vendors.json          # The vendor directory
//! └── events.json           # Append-only status change log
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{StatusEvent, Vendor};
use crate::storage::VendorStore;

const VENDORS_FILE: &str = "vendors.json";
const EVENTS_FILE: &str = "events.json";

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load the whole vendor directory.
    pub async fn load_vendors(&self) -> Result<Vec<Vendor>> {
        match self.read_json::<Vec<Vendor>>(VENDORS_FILE).await? {
            Some(vendors) => Ok(vendors),
            None => {
                log::warn!("No {VENDORS_FILE} found");
                Ok(Vec::new())
            }
        }
    }

    /// Replace the whole vendor directory.
    pub async fn save_vendors(&self, vendors: &[Vendor]) -> Result<()> {
        self.write_json(VENDORS_FILE, vendors).await
    }

    /// Load the status event log.
    pub async fn load_events(&self) -> Result<Vec<StatusEvent>> {
        Ok(self
            .read_json::<Vec<StatusEvent>>(EVENTS_FILE)
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl VendorStore for LocalStore {
    async fn find_all_trackable(&self) -> Result<Vec<Vendor>> {
        let vendors = self.load_vendors().await?;
        Ok(vendors.into_iter().filter(Vendor::is_trackable).collect())
    }

    async fn apply_batch(&self, vendors: &[Vendor], events: &[StatusEvent]) -> Result<()> {
        let mut all = self.load_vendors().await?;
        for update in vendors {
            match all.iter_mut().find(|v| v.id == update.id) {
                Some(existing) => *existing = update.clone(),
                None => all.push(update.clone()),
            }
        }

        let mut event_log = self.load_events().await?;
        event_log.extend(events.iter().cloned());

        // Vendors land before events; each file write is atomic.
        self.write_json(VENDORS_FILE, &all).await?;
        self.write_json(EVENTS_FILE, &event_log).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use chrono::Utc;
    use tempfile::TempDir;

    fn vendor(id: &str, url: Option<&str>) -> Vendor {
        Vendor {
            id: id.to_string(),
            name: id.to_string(),
            status_url: url.map(str::to_string),
            status: Status::Unknown,
            last_checked: None,
            tracking_issue: false,
        }
    }

    #[tokio::test]
    async fn missing_files_read_as_empty() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        assert!(store.load_vendors().await.unwrap().is_empty());
        assert!(store.load_events().await.unwrap().is_empty());
        assert!(store.find_all_trackable().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_all_trackable_skips_vendors_without_url() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store
            .save_vendors(&[
                vendor("a", Some("https://example.com/a")),
                vendor("b", None),
                vendor("c", Some("")),
            ])
            .await
            .unwrap();

        let trackable = store.find_all_trackable().await.unwrap();
        assert_eq!(trackable.len(), 1);
        assert_eq!(trackable[0].id, "a");
    }

    #[tokio::test]
    async fn apply_batch_updates_vendors_and_appends_events() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store
            .save_vendors(&[
                vendor("a", Some("https://example.com/a")),
                vendor("b", None),
            ])
            .await
            .unwrap();

        let mut updated = vendor("a", Some("https://example.com/a"));
        updated.status = Status::Open;
        let event = StatusEvent::new(
            "https://example.com/a",
            "a",
            Status::Unknown,
            Status::Open,
            Utc::now(),
        );

        store
            .apply_batch(std::slice::from_ref(&updated), std::slice::from_ref(&event))
            .await
            .unwrap();

        let vendors = store.load_vendors().await.unwrap();
        assert_eq!(vendors.len(), 2);
        assert_eq!(vendors[0].status, Status::Open);
        // Untouched vendors are preserved as-is
        assert_eq!(vendors[1].status, Status::Unknown);

        let events = store.load_events().await.unwrap();
        assert_eq!(events.len(), 1);

        // A second batch appends rather than replaces
        store.apply_batch(&[], std::slice::from_ref(&event)).await.unwrap();
        assert_eq!(store.load_events().await.unwrap().len(), 2);
    }
}

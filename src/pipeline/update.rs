// src/pipeline/update.rs

//! Update orchestrator.
//!
//! Drives one full tracking pass: selects trackable vendors, prefetches
//! their status pages with bounded concurrency, classifies each snapshot
//! sequentially, detects status transitions, and commits all results as a
//! single batch (or discards them in dry-run mode). Per-vendor errors are
//! caught here and never escape the run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, ParserError, Result};
use crate::models::{Config, Snapshot, Status, StatusEvent};
use crate::services::SnapshotCache;
use crate::storage::VendorStore;
use crate::tracker::StatusParser;

/// Flags controlling one tracking pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Clear the snapshot cache first, forcing a re-fetch of every URL
    pub refresh: bool,

    /// Compute everything but discard all mutations
    pub dry_run: bool,
}

/// Outcome of one tracking pass.
#[derive(Debug, Default)]
pub struct UpdateSummary {
    /// Trackable vendors attempted this pass
    pub checked: usize,

    /// Status transitions observed (one event each)
    pub changed: usize,

    /// Vendors whose check failed (network or classification)
    pub failed: usize,

    /// Whether mutations were discarded
    pub dry_run: bool,

    /// Per-vendor failure details for operator visibility
    pub failures: Vec<CheckFailure>,
}

/// One vendor's failed check.
#[derive(Debug, Clone)]
pub struct CheckFailure {
    pub vendor: String,
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Kind of a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    LoginRequired,
    FilteringFailed,
    AmbiguousMatch,
    NoMatch,
}

impl From<&ParserError> for FailureKind {
    fn from(error: &ParserError) -> Self {
        match error {
            ParserError::LoginRequired => Self::LoginRequired,
            ParserError::FilteringFailed(_) => Self::FilteringFailed,
            ParserError::AmbiguousMatch => Self::AmbiguousMatch,
            ParserError::NoMatch => Self::NoMatch,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::Network => "network error",
            FailureKind::LoginRequired => "login required",
            FailureKind::FilteringFailed => "filtering failed",
            FailureKind::AmbiguousMatch => "ambiguous match",
            FailureKind::NoMatch => "no match",
        };
        f.write_str(text)
    }
}

/// Run one full tracking pass.
///
/// Nothing is persisted until the single commit at the end, so cancelling
/// the token at any earlier point aborts with zero observable state change.
pub async fn run_update(
    config: &Config,
    store: &dyn VendorStore,
    cache: &SnapshotCache,
    parser: &StatusParser,
    options: UpdateOptions,
    cancel: &CancellationToken,
) -> Result<UpdateSummary> {
    let mut vendors = store.find_all_trackable().await?;
    log::info!("Checking {} trackable vendors", vendors.len());

    if options.refresh {
        cache.clear().await;
    }

    let mut summary = UpdateSummary {
        dry_run: options.dry_run,
        ..UpdateSummary::default()
    };

    // Prefetch phase: bounded fan-out, join barrier before classification.
    let concurrency = config.fetcher.max_concurrent.max(1);
    let delay = Duration::from_millis(config.fetcher.request_delay_ms);

    let jobs: Vec<(usize, String, String)> = vendors
        .iter()
        .enumerate()
        .filter_map(|(index, vendor)| {
            vendor
                .tracked_url()
                .map(|url| (index, url.to_string(), vendor.name.clone()))
        })
        .collect();

    let mut snapshots: Vec<Option<Arc<Snapshot>>> = vec![None; vendors.len()];
    {
        let mut fetch_stream = stream::iter(jobs)
            .map(|(index, url, name)| async move {
                let result = cache.get(&url, &name, false).await;
                (index, url, name, result)
            })
            .buffer_unordered(concurrency);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::warn!("Update run cancelled during prefetch");
                    return Err(AppError::Cancelled);
                }
                next = fetch_stream.next() => {
                    let Some((index, url, name, result)) = next else { break };
                    match result {
                        Ok(snapshot) => snapshots[index] = Some(snapshot),
                        Err(error) => {
                            log::warn!("Failed fetching: {name} ( {url} ): {error}");
                            summary.failures.push(CheckFailure {
                                vendor: name,
                                url,
                                kind: FailureKind::Network,
                                message: error.to_string(),
                            });
                        }
                    }
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    // Classification phase: sequential, touches ordered shared state.
    let now = Utc::now();
    let mut events = Vec::new();

    for (index, vendor) in vendors.iter_mut().enumerate() {
        summary.checked += 1;
        let url = vendor.tracked_url().unwrap_or_default().to_string();

        match snapshots[index].as_ref() {
            Some(snapshot) => {
                let (status, issue) = match parser.parse(snapshot, &vendor.name) {
                    Ok(status) => (status, false),
                    Err(error) => {
                        log::warn!("Failed: {} ( {url} ): {error}", vendor.name);
                        summary.failures.push(CheckFailure {
                            vendor: vendor.name.clone(),
                            url: url.clone(),
                            kind: FailureKind::from(&error),
                            message: error.to_string(),
                        });
                        (Status::Unknown, true)
                    }
                };

                if vendor.status != status {
                    let event =
                        StatusEvent::new(&url, &vendor.name, vendor.status, status, now);
                    log::info!("{event}");
                    events.push(event);
                    summary.changed += 1;
                }

                vendor.status = status;
                vendor.tracking_issue = issue;
                vendor.last_checked = Some(snapshot.retrieved_at);

                if config.logging.show_progress {
                    log::info!("Checked {} -> {}", vendor.name, vendor.status);
                }
            }
            None => {
                // Fetch failed: the last known status stays, but the check
                // attempt still advances last-checked.
                vendor.tracking_issue = true;
                vendor.last_checked = Some(now);
            }
        }
    }

    summary.failed = summary.failures.len();

    if cancel.is_cancelled() {
        log::warn!("Update run cancelled before commit");
        return Err(AppError::Cancelled);
    }

    if options.dry_run {
        log::info!(
            "Dry run: discarding {} vendor updates and {} events",
            vendors.len(),
            events.len()
        );
    } else {
        store.apply_batch(&vendors, &events).await?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use crate::models::Vendor;
    use crate::storage::LocalStore;

    /// Minimal HTTP server answering every request with the given body and
    /// counting how many requests arrived.
    async fn spawn_server(body: &'static str, hits: Arc<AtomicUsize>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                hits.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        format!("http://{addr}/")
    }

    fn vendor(id: &str, url: Option<&str>, status: Status) -> Vendor {
        Vendor {
            id: id.to_string(),
            name: id.to_string(),
            status_url: url.map(str::to_string),
            status,
            last_checked: None,
            tracking_issue: false,
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.fetcher.request_delay_ms = 0;
        config.fetcher.timeout_secs = 5;
        config
    }

    async fn run(
        config: &Config,
        store: &LocalStore,
        cache: &SnapshotCache,
        options: UpdateOptions,
    ) -> Result<UpdateSummary> {
        let parser = StatusParser::new(&config.patterns).unwrap();
        run_update(
            config,
            store,
            cache,
            &parser,
            options,
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test]
    async fn full_pass_detects_transitions_and_failures() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url_a = spawn_server("commissions are open", Arc::clone(&hits)).await;
        let url_b = spawn_server("my commissions are open!", Arc::clone(&hits)).await;
        let url_c = "http://127.0.0.1:1/";

        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store
            .save_vendors(&[
                vendor("a", Some(&url_a), Status::Closed),
                vendor("b", Some(&url_b), Status::Open),
                vendor("c", Some(url_c), Status::Open),
                vendor("d", None, Status::Closed),
            ])
            .await
            .unwrap();

        let config = test_config();
        let cache = SnapshotCache::new(&config.fetcher).unwrap();
        let summary = run(&config, &store, &cache, UpdateOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.checked, 3);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].vendor, "c");
        assert_eq!(summary.failures[0].kind, FailureKind::Network);

        let vendors = store.load_vendors().await.unwrap();
        let by_id = |id: &str| vendors.iter().find(|v| v.id == id).unwrap();

        // A flipped, B stayed, C kept its last known status with an issue flag
        assert_eq!(by_id("a").status, Status::Open);
        assert!(!by_id("a").tracking_issue);
        assert!(by_id("a").last_checked.is_some());
        assert_eq!(by_id("b").status, Status::Open);
        assert_eq!(by_id("c").status, Status::Open);
        assert!(by_id("c").tracking_issue);
        assert!(by_id("c").last_checked.is_some());

        // The untracked vendor was never touched
        assert_eq!(by_id("d").status, Status::Closed);
        assert!(by_id("d").last_checked.is_none());

        let events = store.load_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].vendor_name, "a");
        assert_eq!(events[0].old_status, Status::Closed);
        assert_eq!(events[0].new_status, Status::Open);
    }

    #[tokio::test]
    async fn dry_run_reports_but_persists_nothing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url_a = spawn_server("commissions are open", Arc::clone(&hits)).await;

        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store
            .save_vendors(&[vendor("a", Some(&url_a), Status::Closed)])
            .await
            .unwrap();

        let vendors_path = tmp.path().join("vendors.json");
        let before = tokio::fs::read(&vendors_path).await.unwrap();

        let config = test_config();
        let cache = SnapshotCache::new(&config.fetcher).unwrap();
        let summary = run(
            &config,
            &store,
            &cache,
            UpdateOptions {
                refresh: false,
                dry_run: true,
            },
        )
        .await
        .unwrap();

        // The summary reports what would have changed
        assert!(summary.dry_run);
        assert_eq!(summary.checked, 1);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.failed, 0);

        // But the store is byte-for-byte unchanged and no event log appeared
        let after = tokio::fs::read(&vendors_path).await.unwrap();
        assert_eq!(before, after);
        assert!(!tmp.path().join("events.json").exists());
    }

    #[tokio::test]
    async fn vendors_sharing_a_url_trigger_one_fetch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_server("commissions are open", Arc::clone(&hits)).await;

        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store
            .save_vendors(&[
                vendor("a", Some(&url), Status::Unknown),
                vendor("b", Some(&url), Status::Unknown),
            ])
            .await
            .unwrap();

        let config = test_config();
        let cache = SnapshotCache::new(&config.fetcher).unwrap();
        let summary = run(&config, &store, &cache, UpdateOptions::default())
            .await
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(summary.checked, 2);
        assert_eq!(summary.changed, 2);

        let vendors = store.load_vendors().await.unwrap();
        assert!(vendors.iter().all(|v| v.status == Status::Open));
    }

    #[tokio::test]
    async fn refresh_forces_a_new_fetch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_server("commissions are open", Arc::clone(&hits)).await;

        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store
            .save_vendors(&[vendor("a", Some(&url), Status::Unknown)])
            .await
            .unwrap();

        let config = test_config();
        let cache = SnapshotCache::new(&config.fetcher).unwrap();

        run(&config, &store, &cache, UpdateOptions::default())
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Without refresh the cached snapshot is reused across runs
        run(&config, &store, &cache, UpdateOptions::default())
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // With refresh every trackable URL is fetched again
        run(
            &config,
            &store,
            &cache,
            UpdateOptions {
                refresh: true,
                dry_run: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn classification_failure_forces_unknown() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_server("just a gallery, nothing to see", Arc::clone(&hits)).await;

        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store
            .save_vendors(&[vendor("a", Some(&url), Status::Open)])
            .await
            .unwrap();

        let config = test_config();
        let cache = SnapshotCache::new(&config.fetcher).unwrap();
        let summary = run(&config, &store, &cache, UpdateOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.checked, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].kind, FailureKind::NoMatch);
        // Open -> Unknown is a transition like any other
        assert_eq!(summary.changed, 1);

        let vendors = store.load_vendors().await.unwrap();
        assert_eq!(vendors[0].status, Status::Unknown);
        assert!(vendors[0].tracking_issue);

        let events = store.load_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].new_status, Status::Unknown);
    }

    #[tokio::test]
    async fn cancelled_run_persists_nothing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_server("commissions are open", Arc::clone(&hits)).await;

        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store
            .save_vendors(&[vendor("a", Some(&url), Status::Closed)])
            .await
            .unwrap();

        let before = tokio::fs::read(tmp.path().join("vendors.json")).await.unwrap();

        let config = test_config();
        let cache = SnapshotCache::new(&config.fetcher).unwrap();
        let parser = StatusParser::new(&config.patterns).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = run_update(
            &config,
            &store,
            &cache,
            &parser,
            UpdateOptions::default(),
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(AppError::Cancelled)));
        let after = tokio::fs::read(tmp.path().join("vendors.json")).await.unwrap();
        assert_eq!(before, after);
        assert!(!tmp.path().join("events.json").exists());
    }
}

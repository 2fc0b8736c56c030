//! Cached webpage snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fetched content of a tracked URL at a point in time.
///
/// A page may expose more than one representation (e.g. an API response next
/// to a rendered document), so a snapshot holds one or more content bodies.
/// Immutable once created; the cache replaces snapshots wholesale on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// URL the content was retrieved from
    pub url: String,

    /// Display name of the vendor owning the URL
    pub owner_name: String,

    /// Retrieved content bodies
    pub contents: Vec<String>,

    /// When the content was retrieved
    pub retrieved_at: DateTime<Utc>,
}

impl Snapshot {
    /// Create a snapshot with a single content body, retrieved now.
    pub fn single(
        url: impl Into<String>,
        owner_name: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            owner_name: owner_name.into(),
            contents: vec![body.into()],
            retrieved_at: Utc::now(),
        }
    }

    pub fn all_contents(&self) -> &[String] {
        &self.contents
    }
}

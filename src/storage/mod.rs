// src/storage/mod.rs

//! Vendor store abstractions.
//!
//! The tracker only needs a read/write boundary to the directory: which
//! vendors are trackable, and a way to commit a pass's results as one batch.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{StatusEvent, Vendor};

// Re-export for convenience
pub use local::LocalStore;

/// Persistence boundary for vendors and their status events.
#[async_trait]
pub trait VendorStore: Send + Sync {
    /// All vendors with a non-empty tracked URL.
    async fn find_all_trackable(&self) -> Result<Vec<Vendor>>;

    /// Persist vendor updates and new events as a single batch, or fail
    /// without partially applying them.
    async fn apply_batch(&self, vendors: &[Vendor], events: &[StatusEvent]) -> Result<()>;
}

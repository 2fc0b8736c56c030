//! Vendor data structures.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Commission status of a vendor.
///
/// Unknown is a first-class value: it is what a vendor ends up with when the
/// last automated check could not produce a definite answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Closed,
    #[default]
    Unknown,
}

impl Status {
    /// Human-readable status text.
    pub fn text(&self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::Closed => "Closed",
            Status::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// A directory entry representing a commission-taking creator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vendor {
    /// Unique identifier within the directory
    pub id: String,

    /// Display name
    pub name: String,

    /// URL of the page checked for commission status, if tracked
    #[serde(default)]
    pub status_url: Option<String>,

    /// Current commission status
    #[serde(default)]
    pub status: Status,

    /// When the status was last checked by the tracker
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,

    /// Set when the most recent check could not determine a definite status
    #[serde(default)]
    pub tracking_issue: bool,
}

impl Vendor {
    /// The tracked URL, if present and non-empty.
    ///
    /// A vendor without one is never auto-updated.
    pub fn tracked_url(&self) -> Option<&str> {
        self.status_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Whether this vendor is subject to automated status tracking.
    pub fn is_trackable(&self) -> bool {
        self.tracked_url().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vendor(url: Option<&str>) -> Vendor {
        Vendor {
            id: "silverpaws".to_string(),
            name: "Silverpaws".to_string(),
            status_url: url.map(str::to_string),
            status: Status::Unknown,
            last_checked: None,
            tracking_issue: false,
        }
    }

    #[test]
    fn vendor_without_url_is_not_trackable() {
        assert!(!sample_vendor(None).is_trackable());
        assert!(!sample_vendor(Some("")).is_trackable());
        assert!(!sample_vendor(Some("   ")).is_trackable());
    }

    #[test]
    fn vendor_with_url_is_trackable() {
        let vendor = sample_vendor(Some("https://example.com/status"));
        assert!(vendor.is_trackable());
        assert_eq!(vendor.tracked_url(), Some("https://example.com/status"));
    }

    #[test]
    fn status_defaults_to_unknown() {
        let vendor: Vendor = serde_json::from_str(r#"{"id": "a", "name": "A"}"#).unwrap();
        assert_eq!(vendor.status, Status::Unknown);
        assert!(!vendor.tracking_issue);
    }

    #[test]
    fn status_text() {
        assert_eq!(Status::Open.text(), "Open");
        assert_eq!(Status::Closed.to_string(), "Closed");
    }
}

//! Status change events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Status;

/// Record of one observed status transition.
///
/// Append-only; created exactly once per transition, never for a no-op check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusEvent {
    /// URL that was checked
    pub url: String,

    /// Vendor display name at the time of the check
    pub vendor_name: String,

    /// Status before the check
    pub old_status: Status,

    /// Status after the check
    pub new_status: Status,

    /// When the transition was observed
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(
        url: impl Into<String>,
        vendor_name: impl Into<String>,
        old_status: Status,
        new_status: Status,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.into(),
            vendor_name: vendor_name.into(),
            old_status,
            new_status,
            timestamp,
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ( {} ) {} ---> {}",
            self.vendor_name, self.url, self.old_status, self.new_status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_transition() {
        let event = StatusEvent::new(
            "https://example.com/status",
            "Silverpaws",
            Status::Closed,
            Status::Open,
            Utc::now(),
        );
        assert_eq!(
            event.to_string(),
            "Silverpaws ( https://example.com/status ) Closed ---> Open"
        );
    }
}

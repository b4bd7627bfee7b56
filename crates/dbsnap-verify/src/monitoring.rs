//! Status reporting
//!
//! The verifier reports its health as a single `MONITORING|...` line per
//! completed cycle or alarm. Lines go through a [`StatusSink`] so tests
//! can capture them.

use dbsnap_common::monitoring::{MetricTags, VERIFY_STATUS_METRIC};
use dbsnap_common::{CheckStatus, StatusLine};
#[cfg(any(test, feature = "test-utils"))]
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

/// Log target of emitted status lines
pub const MONITORING_TARGET: &str = "dbsnap::monitoring";

pub trait StatusSink: Send + Sync {
    fn emit(&self, line: &StatusLine);
}

/// Status check line for one database
pub fn verification_status(database: &str, status: CheckStatus) -> StatusLine {
    StatusLine::check(
        VERIFY_STATUS_METRIC,
        status,
        MetricTags::new().with("database", database),
    )
}

/// Writes status lines to the log: OK at info, anything else at error
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn emit(&self, line: &StatusLine) {
        match line.status() {
            Some(CheckStatus::Ok) => info!(target: MONITORING_TARGET, "{line}"),
            _ => error!(target: MONITORING_TARGET, "{line}"),
        }
    }
}

/// Keeps every emitted line. Clones share the buffer.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<StatusLine>>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<StatusLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Check statuses in emission order
    pub fn statuses(&self) -> Vec<CheckStatus> {
        self.lines().iter().filter_map(StatusLine::status).collect()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl StatusSink for RecordingSink {
    fn emit(&self, line: &StatusLine) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_status_line() {
        let line = verification_status("prod", CheckStatus::Critical);
        let rendered = line.to_string();
        assert!(rendered.starts_with("MONITORING|"));
        assert!(rendered.ends_with("|2|check|dbsnap-verify.status|#database:prod"));
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.emit(&verification_status("prod", CheckStatus::Ok));
        sink.clone()
            .emit(&verification_status("prod", CheckStatus::Critical));
        assert_eq!(sink.statuses(), [CheckStatus::Ok, CheckStatus::Critical]);
    }
}

//! dbsnap-common - Shared types and utilities
//!
//! This crate holds the pieces shared by the verifier and the copy tool,
//! without any AWS SDK dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`monitoring`]: Datadog-style `MONITORING|...` status lines
//! - [`naming`]: Temporary identifier derivation and reversal
//! - [`tags`]: Marker and provenance tag constants

pub mod monitoring;
pub mod naming;
pub mod tags;

pub use monitoring::{CheckStatus, MetricType, StatusLine};
pub use tags::{Marker, Tags};

/// Current time as fractional seconds since the UNIX epoch.
///
/// This is the timestamp format recorded in state history entries and
/// monitoring lines.
#[inline]
pub fn epoch_seconds() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

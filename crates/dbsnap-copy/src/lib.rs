//! dbsnap-copy - keep RDS snapshots beyond the automated retention window
//!
//! Copies the latest automated snapshot of a database, optionally into
//! another region, and prunes older copies made by this tool.
//!
//! ## Modules
//!
//! - [`copy`]: Copy and prune runs
//! - [`location`]: `<region>:<id>` argument parsing and copy naming

pub mod copy;
pub mod location;

pub use copy::{CopyConfig, CopyReport, copy_latest, prune};
pub use location::{Destination, LocationError, Source};

//! dbsnap-verify - Restore-and-teardown verification of RDS snapshots
//!
//! Each invocation loads the state document for one database, runs the
//! handler for its current state and exits. Progress survives between
//! invocations only through the document.
//!
//! ## Modules
//!
//! - [`config`]: Invocation configuration
//! - [`cycle`]: Decision functions and the effect-performing [`Machine`](cycle::Machine)
//! - [`dispatch`]: Trigger to handler routing
//! - [`error`]: State machine and configuration errors
//! - [`monitoring`]: Status line sinks
//! - [`state`]: State document, transition table and stores
//! - [`trigger`]: Trigger event parsing

pub mod config;
pub mod cycle;
pub mod dispatch;
pub mod error;
pub mod monitoring;
pub mod state;
pub mod trigger;

pub use config::VerifyConfig;
pub use cycle::Outcome;
pub use dispatch::dispatch;
pub use error::{ConfigError, VerifyError};
pub use state::{StateDocument, VerifyState};
pub use trigger::Trigger;

//! Verifier error types
//!
//! Provider faults are classified by [`dbsnap_rds::error`]; this module
//! adds the errors that belong to the state machine and to configuration.

use crate::state::VerifyState;
use dbsnap_rds::{RdsError, classify_anyhow_error};
use thiserror::Error;

/// Exit status for an invocation that found no snapshot to verify
pub const EXIT_NO_SNAPSHOT: i32 = 2;

/// Exit status for an invocation stopped by the safety gate
pub const EXIT_SAFETY_REFUSAL: i32 = 3;

/// State machine errors
#[derive(Debug, Clone, Error)]
pub enum VerifyError {
    /// Requested transition is not in the transition table
    #[error("Illegal transition from '{from}' to '{to}'")]
    IllegalTransition { from: VerifyState, to: VerifyState },

    /// Another invocation saved the document since it was loaded
    #[error("State document for '{database}' was modified by another invocation")]
    ConcurrentModification { database: String },

    /// Persisted document names a state this build does not know
    #[error("Unknown state '{0}'")]
    UnknownState(String),
}

/// Configuration and trigger errors. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing config option: `{0}`")]
    MissingField(&'static str),

    #[error("Choose either `state_doc_bucket` or `state_doc_path`, not both")]
    BothTargets,

    #[error("Missing config option: `state_doc_bucket` or `state_doc_path`")]
    NoTarget,

    #[error("Invalid snapshot type '{0}', must be one of: automated, manual")]
    InvalidSnapshotType(String),

    #[error("Lifecycle events need a state bucket: set STATE_DOC_BUCKET or --state-doc-bucket")]
    MissingBucket,

    #[error("Malformed trigger event: {0}")]
    MalformedTrigger(String),
}

/// Process exit status for a failed invocation.
///
/// Schedulers use the distinct codes to tell an expected "nothing to do"
/// and a refused delete apart from transient provider faults.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match classify_anyhow_error(error) {
        RdsError::NoSnapshotAvailable { .. } => EXIT_NO_SNAPSHOT,
        RdsError::SafetyRefusal { .. } => EXIT_SAFETY_REFUSAL,
        _ => 1,
    }
}

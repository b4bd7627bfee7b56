//! Per-state decisions
//!
//! Each function takes what the handler observed and returns the
//! [`Decision`] to carry out. They never touch the provider or the store,
//! so the whole cycle can be checked without either.

use crate::state::{StateDocument, VerifyState};

/// What the handler observed about the temporary database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed {
    /// Neither an instance nor a cluster exists
    Absent,
    /// Present but not yet available
    Pending,
    Available(Members),
}

/// Member state of an available database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Members {
    /// A standalone instance
    Standalone,
    /// A cluster shell with no member instance yet
    Missing,
    /// A cluster whose first member is not available yet
    Pending,
    /// A cluster whose first member is available
    Available,
}

/// Side effect requested by a decision, carried out before its transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Record the snapshot about to be verified
    BeginVerifying { snapshot_id: String },
    /// Create the subnet group and restore the snapshot
    StartRestore,
    /// Provision the member instance of a restored cluster
    CreateClusterMember,
    /// Apply a fresh password and the verification security groups
    ModifyForVerification,
    /// Guarded delete of the temporary database
    Destroy,
    /// Release the subnet group, clean the document and report OK
    FinishCycle,
    /// Report CRITICAL
    RaiseAlarm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub effect: Effect,
    pub transition: Option<VerifyState>,
    /// Run the next state's handler in the same invocation
    pub chain: bool,
    /// Progress note for the log
    pub note: &'static str,
}

impl Decision {
    fn stay(effect: Effect, note: &'static str) -> Self {
        Self {
            effect,
            transition: None,
            chain: false,
            note,
        }
    }

    fn advance(effect: Effect, to: VerifyState, chain: bool, note: &'static str) -> Self {
        Self {
            effect,
            transition: Some(to),
            chain,
            note,
        }
    }
}

/// `wait`: start a cycle once a snapshot newer than the verified one exists
pub fn decide_wait(document: &StateDocument, latest_snapshot: &str) -> Decision {
    if document.snapshot_verified.as_deref() == Some(latest_snapshot) {
        return Decision::stay(Effect::None, "No snapshot newer than the last verified one");
    }
    Decision::advance(
        Effect::BeginVerifying {
            snapshot_id: latest_snapshot.to_string(),
        },
        VerifyState::Restore,
        true,
        "Found a new snapshot to verify",
    )
}

/// `restore`: start the restore, then wait until the copy and, for
/// clusters, its member are available
pub fn decide_restore(observed: Observed) -> Decision {
    match observed {
        Observed::Absent => Decision::stay(Effect::StartRestore, "Restoring snapshot"),
        Observed::Pending => Decision::stay(Effect::None, "Still restoring snapshot"),
        Observed::Available(Members::Missing) => {
            Decision::stay(Effect::CreateClusterMember, "Creating cluster member instance")
        }
        Observed::Available(Members::Pending) => Decision::stay(
            Effect::None,
            "Waiting for cluster member instance to become available",
        ),
        Observed::Available(Members::Standalone | Members::Available) => Decision::advance(
            Effect::None,
            VerifyState::Modify,
            true,
            "Restore complete",
        ),
    }
}

/// `modify`: apply the verification credentials
pub fn decide_modify(observed: Observed) -> Decision {
    match observed {
        Observed::Absent => {
            Decision::stay(Effect::None, "Temporary database missing, cannot modify")
        }
        Observed::Pending | Observed::Available(_) => Decision::advance(
            Effect::ModifyForVerification,
            VerifyState::Verify,
            true,
            "Modifying master password and security groups",
        ),
    }
}

/// `verify`: proceed once the password reset has been applied.
///
/// The "Reset master credentials" event together with an available status
/// marks the end of the modify; status alone races with the rotation.
pub fn decide_verify(observed: Observed, credentials_reset: bool) -> Decision {
    match observed {
        Observed::Absent => {
            Decision::stay(Effect::None, "Temporary database missing, cannot verify")
        }
        Observed::Available(_) if credentials_reset => Decision::advance(
            Effect::None,
            VerifyState::Cleanup,
            true,
            "Skipping content checks, not implemented",
        ),
        _ => Decision::stay(Effect::None, "Waiting for master credentials reset"),
    }
}

/// `cleanup`: destroy the copy, then close the cycle once it is gone
pub fn decide_cleanup(observed: Observed) -> Decision {
    match observed {
        Observed::Absent => Decision::advance(
            Effect::FinishCycle,
            VerifyState::Wait,
            false,
            "Temporary database gone, cycle complete",
        ),
        Observed::Available(_) => Decision::stay(Effect::Destroy, "Destroying temporary database"),
        Observed::Pending => Decision::stay(Effect::None, "Still destroying temporary database"),
    }
}

/// `alarm`: report, nothing else
pub fn decide_alarm() -> Decision {
    Decision::stay(Effect::RaiseAlarm, "Alarm raised")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerifyConfig;
    use serde_json::json;

    const ALL_OBSERVED: [Observed; 6] = [
        Observed::Absent,
        Observed::Pending,
        Observed::Available(Members::Standalone),
        Observed::Available(Members::Missing),
        Observed::Available(Members::Pending),
        Observed::Available(Members::Available),
    ];

    fn document() -> StateDocument {
        let config: VerifyConfig = serde_json::from_value(json!({
            "database": "prod",
            "snapshot_region": "us-east-1",
            "state_doc_bucket": "bucket",
        }))
        .unwrap();
        StateDocument::create(&config)
    }

    fn assert_legal(from: VerifyState, decision: &Decision) {
        if let Some(to) = decision.transition {
            assert!(from.can_transition_to(to), "{from} -> {to}");
        }
    }

    #[test]
    fn test_wait_starts_cycle_for_new_snapshot() {
        let mut doc = document();
        let decision = decide_wait(&doc, "rds:prod-2024-01-02");
        assert_eq!(
            decision.effect,
            Effect::BeginVerifying {
                snapshot_id: "rds:prod-2024-01-02".to_string()
            }
        );
        assert_eq!(decision.transition, Some(VerifyState::Restore));
        assert!(decision.chain);

        doc.snapshot_verified = Some("rds:prod-2024-01-02".to_string());
        let decision = decide_wait(&doc, "rds:prod-2024-01-02");
        assert_eq!(decision.effect, Effect::None);
        assert_eq!(decision.transition, None);
    }

    #[test]
    fn test_restore() {
        assert_eq!(decide_restore(Observed::Absent).effect, Effect::StartRestore);
        assert_eq!(decide_restore(Observed::Pending).transition, None);
        assert_eq!(
            decide_restore(Observed::Available(Members::Missing)).effect,
            Effect::CreateClusterMember
        );
        assert_eq!(
            decide_restore(Observed::Available(Members::Pending)).transition,
            None
        );
        for members in [Members::Standalone, Members::Available] {
            let decision = decide_restore(Observed::Available(members));
            assert_eq!(decision.transition, Some(VerifyState::Modify));
            assert!(decision.chain);
        }
    }

    #[test]
    fn test_modify_and_verify_stay_when_absent() {
        assert_eq!(decide_modify(Observed::Absent).transition, None);
        assert_eq!(decide_verify(Observed::Absent, true).transition, None);
        assert_eq!(
            decide_modify(Observed::Available(Members::Standalone)).effect,
            Effect::ModifyForVerification
        );
    }

    #[test]
    fn test_verify_needs_reset_event_and_availability() {
        let available = Observed::Available(Members::Standalone);
        assert_eq!(decide_verify(available, false).transition, None);
        assert_eq!(decide_verify(Observed::Pending, true).transition, None);
        assert_eq!(
            decide_verify(available, true).transition,
            Some(VerifyState::Cleanup)
        );
    }

    #[test]
    fn test_cleanup() {
        let done = decide_cleanup(Observed::Absent);
        assert_eq!(done.effect, Effect::FinishCycle);
        assert_eq!(done.transition, Some(VerifyState::Wait));
        assert!(!done.chain);

        assert_eq!(
            decide_cleanup(Observed::Available(Members::Available)).effect,
            Effect::Destroy
        );
        assert_eq!(decide_cleanup(Observed::Pending).effect, Effect::None);
    }

    #[test]
    fn test_alarm_never_transitions() {
        let decision = decide_alarm();
        assert_eq!(decision.effect, Effect::RaiseAlarm);
        assert_eq!(decision.transition, None);
    }

    #[test]
    fn test_decisions_only_request_legal_transitions() {
        for observed in ALL_OBSERVED {
            assert_legal(VerifyState::Restore, &decide_restore(observed));
            assert_legal(VerifyState::Modify, &decide_modify(observed));
            assert_legal(VerifyState::Verify, &decide_verify(observed, true));
            assert_legal(VerifyState::Verify, &decide_verify(observed, false));
            assert_legal(VerifyState::Cleanup, &decide_cleanup(observed));
        }
        assert_legal(VerifyState::Wait, &decide_wait(&document(), "snap"));
        assert_legal(VerifyState::Alarm, &decide_alarm());
    }
}

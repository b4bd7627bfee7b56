//! End-to-end cycle tests against the in-memory provider
//!
//! Each invocation is a separate `dispatch` call; provider progress
//! between invocations is simulated by changing the fake's state.

use anyhow::Result;
use dbsnap_common::CheckStatus;
use dbsnap_rds::{EventSourceType, RdsError};
use dbsnap_test_utils::{Call, FakeRds, fixtures};
use dbsnap_verify::error::{EXIT_NO_SNAPSHOT, EXIT_SAFETY_REFUSAL, exit_code};
use dbsnap_verify::monitoring::RecordingSink;
use dbsnap_verify::state::{FileStore, MemoryStore, StateStore};
use dbsnap_verify::{Outcome, StateDocument, Trigger, VerifyConfig, VerifyState, dispatch};
use serde_json::json;

const REGION: &str = "us-east-1";

fn config(database: &str) -> VerifyConfig {
    serde_json::from_value(json!({
        "database": database,
        "snapshot_region": REGION,
        "database_subnet_ids": ["subnet-a", "subnet-b"],
        "database_security_group_ids": ["sg-verify"],
        "state_doc_bucket": "dbsnap-state",
    }))
    .unwrap()
}

async fn invoke<S: StateStore>(
    store: &S,
    sink: &RecordingSink,
    rds: &FakeRds,
    trigger: Trigger,
) -> Result<Outcome> {
    let rds = rds.clone();
    dispatch(store, sink, trigger, move |region| async move {
        assert_eq!(region, REGION);
        Ok(rds)
    })
    .await
}

/// A document that has already walked the cycle up to `state`
fn document_in(database: &str, path: &[VerifyState]) -> StateDocument {
    let mut doc = StateDocument::create(&config(database));
    for state in path {
        doc.transition(*state).unwrap();
    }
    doc
}

fn advanced(outcome: &Outcome) -> (VerifyState, VerifyState, usize) {
    match outcome {
        Outcome::Advanced {
            from, to, steps, ..
        } => (*from, *to, *steps),
        Outcome::Ignored { reason } => panic!("unexpected ignore: {reason}"),
    }
}

#[tokio::test]
async fn test_first_trigger_creates_document() {
    let store = MemoryStore::new();
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);

    let err = invoke(&store, &sink, &rds, Trigger::Config(config("prod-test-db")))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RdsError>(),
        Some(RdsError::NoSnapshotAvailable { .. })
    ));
    assert_eq!(exit_code(&err), EXIT_NO_SNAPSHOT);

    let doc = store.get("prod-test-db").unwrap();
    assert_eq!(doc.tmp_database, "dbsv-prod-test-db");
    assert_eq!(doc.states().len(), 1);
    assert_eq!(doc.current_state(), VerifyState::Wait);
    assert!(rds.calls().is_empty());
}

#[tokio::test]
async fn test_instance_full_cycle() {
    let store = MemoryStore::new();
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);
    let tmp = "dbsv-prod-test-db";
    rds.add_snapshot(
        fixtures::snapshot("rds:prod-test-db-old", "prod-test-db", 100.0, "automated"),
        &[],
    );
    rds.add_snapshot(
        fixtures::snapshot("rds:prod-test-db-new", "prod-test-db", 200.0, "automated"),
        &[],
    );
    let trigger = || Trigger::Config(config("prod-test-db"));

    // wait -> restore, restore starts provisioning
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Wait, VerifyState::Restore, 2));
    let doc = store.get("prod-test-db").unwrap();
    assert_eq!(doc.snapshot_verifying.as_deref(), Some("rds:prod-test-db-new"));
    assert_eq!(
        rds.calls(),
        [
            Call::CreateSubnetGroup(tmp.to_string()),
            Call::Restore {
                target_id: tmp.to_string(),
                snapshot_id: "rds:prod-test-db-new".to_string(),
                subnet_group: tmp.to_string(),
            },
        ]
    );

    // Still restoring: nothing happens
    rds.clear_calls();
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Restore, VerifyState::Restore, 1));
    assert!(rds.calls().is_empty());

    // Available: restore -> modify -> verify
    rds.set_status(tmp, "available");
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Restore, VerifyState::Verify, 3));
    assert_eq!(
        rds.calls(),
        [Call::Modify {
            id: tmp.to_string(),
            security_group_ids: vec!["sg-verify".to_string()],
        }]
    );
    let doc = store.get("prod-test-db").unwrap();
    assert_eq!(doc.tmp_password.as_ref().map(String::len), Some(16));

    // Password reset applied: verify -> cleanup, cleanup starts the delete
    rds.clear_calls();
    rds.add_event(tmp, "Reset master credentials");
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Verify, VerifyState::Cleanup, 2));
    assert_eq!(rds.calls(), [Call::DeleteInstance(tmp.to_string())]);

    // Delete in progress
    rds.clear_calls();
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Cleanup, VerifyState::Cleanup, 1));
    assert!(rds.calls().is_empty());
    assert!(sink.statuses().is_empty());

    // Gone: cleanup -> wait
    rds.remove_database(tmp);
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Cleanup, VerifyState::Wait, 1));
    assert_eq!(rds.calls(), [Call::DeleteSubnetGroup(tmp.to_string())]);
    let doc = store.get("prod-test-db").unwrap();
    assert_eq!(doc.tmp_password, None);
    assert_eq!(doc.snapshot_verifying, None);
    assert_eq!(doc.snapshot_verified.as_deref(), Some("rds:prod-test-db-new"));
    assert_eq!(sink.statuses(), [CheckStatus::Ok]);

    // Same snapshot: rest in wait
    rds.clear_calls();
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Wait, VerifyState::Wait, 1));
    assert!(rds.calls().is_empty());
}

#[tokio::test]
async fn test_cluster_cycle() {
    let store = MemoryStore::new();
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);
    rds.add_snapshot(fixtures::cluster_snapshot("rds:aurora-1", "aurora", 100.0), &[]);
    let trigger = || Trigger::Config(config("aurora"));

    invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert!(rds.database("dbsv-aurora").is_some_and(|db| db.is_cluster()));

    // Available shell without members
    rds.clear_calls();
    rds.set_status("dbsv-aurora", "available");
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Restore, VerifyState::Restore, 1));
    assert_eq!(
        rds.calls(),
        [Call::CreateClusterMember {
            instance_id: "i-dbsv-aurora".to_string(),
            cluster_id: "dbsv-aurora".to_string(),
            instance_class: "db.r5.large".to_string(),
        }]
    );

    // Member still creating
    rds.clear_calls();
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Restore, VerifyState::Restore, 1));
    assert!(rds.calls().is_empty());

    rds.set_status("i-dbsv-aurora", "available");
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Restore, VerifyState::Verify, 3));
    assert!(matches!(&rds.calls()[..], [Call::Modify { id, .. }] if id == "dbsv-aurora"));

    // Only an instance-level event: no reset seen yet
    rds.clear_calls();
    rds.add_event("dbsv-aurora", "Finished DB Instance backup");
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Verify, VerifyState::Verify, 1));
    assert!(rds.calls().is_empty());

    // Clusters report the reset under the cluster source type
    rds.add_event_for("dbsv-aurora", EventSourceType::DbCluster, "Reset master credentials");
    let outcome = invoke(&store, &sink, &rds, trigger()).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Verify, VerifyState::Cleanup, 2));
    assert_eq!(
        rds.calls(),
        [
            Call::DeleteInstance("i-dbsv-aurora".to_string()),
            Call::DeleteCluster("dbsv-aurora".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_cleanup_refuses_unmarked_database() {
    use VerifyState::*;
    let store = MemoryStore::new();
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);
    store.insert(document_in("prod", &[Restore, Modify, Verify, Cleanup]));
    rds.add_instance("dbsv-prod", "available", &[("Name", "dbsv-prod")]);

    let err = invoke(&store, &sink, &rds, Trigger::Config(config("prod")))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RdsError>(),
        Some(RdsError::SafetyRefusal { .. })
    ));
    assert_eq!(exit_code(&err), EXIT_SAFETY_REFUSAL);
    assert!(rds.calls().is_empty());
    assert_eq!(store.get("prod").unwrap().current_state(), Cleanup);
}

#[tokio::test]
async fn test_alarm_reports_critical_without_provider_calls() {
    let store = MemoryStore::new();
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);
    store.insert(document_in("prod", &[VerifyState::Alarm]));

    for _ in 0..2 {
        let outcome = invoke(&store, &sink, &rds, Trigger::Config(config("prod")))
            .await
            .unwrap();
        assert_eq!(advanced(&outcome), (VerifyState::Alarm, VerifyState::Alarm, 1));
    }
    assert_eq!(sink.statuses(), [CheckStatus::Critical, CheckStatus::Critical]);
    assert!(sink.lines()[0].to_string().contains("#database:prod"));
    assert!(rds.calls().is_empty());
}

#[tokio::test]
async fn test_failed_persist_blocks_side_effects() {
    let store = MemoryStore::new();
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);
    store.insert(document_in("prod", &[]));
    rds.add_snapshot(fixtures::snapshot("rds:prod-1", "prod", 100.0, "automated"), &[]);

    store.fail_saves(true);
    assert!(
        invoke(&store, &sink, &rds, Trigger::Config(config("prod")))
            .await
            .is_err()
    );

    let doc = store.get("prod").unwrap();
    assert_eq!(doc.current_state(), VerifyState::Wait);
    assert_eq!(doc.snapshot_verifying, None);
    assert!(rds.calls().is_empty());
}

#[tokio::test]
async fn test_provider_fault_leaves_document_untouched() {
    let store = MemoryStore::new();
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);
    store.insert(document_in("prod", &[VerifyState::Restore]));
    rds.add_instance("dbsv-prod", "available", &[]);
    rds.fail_on("modify_for_verification");

    assert!(
        invoke(&store, &sink, &rds, Trigger::Config(config("prod")))
            .await
            .is_err()
    );
    // restore -> modify was persisted, modify -> verify was not
    let doc = store.get("prod").unwrap();
    assert_eq!(doc.current_state(), VerifyState::Modify);
    assert_eq!(doc.tmp_password, None);

    rds.clear_failures();
    let outcome = invoke(&store, &sink, &rds, Trigger::Config(config("prod")))
        .await
        .unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Modify, VerifyState::Verify, 2));
}

#[tokio::test]
async fn test_modify_without_database_stays() {
    let store = MemoryStore::new();
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);
    store.insert(document_in(
        "prod",
        &[VerifyState::Restore, VerifyState::Modify],
    ));

    let outcome = invoke(&store, &sink, &rds, Trigger::Config(config("prod")))
        .await
        .unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Modify, VerifyState::Modify, 1));
    assert!(rds.calls().is_empty());
}

#[tokio::test]
async fn test_restore_falls_back_to_latest_when_snapshot_expired() {
    let store = MemoryStore::new();
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);
    let mut doc = document_in("prod", &[VerifyState::Restore]);
    doc.snapshot_verifying = Some("rds:prod-expired".to_string());
    store.insert(doc);
    rds.add_snapshot(fixtures::snapshot("rds:prod-2", "prod", 200.0, "automated"), &[]);

    invoke(&store, &sink, &rds, Trigger::Config(config("prod")))
        .await
        .unwrap();

    assert!(rds.calls().iter().any(|c| matches!(
        c,
        Call::Restore { snapshot_id, .. } if snapshot_id == "rds:prod-2"
    )));
    assert_eq!(
        store.get("prod").unwrap().snapshot_verifying.as_deref(),
        Some("rds:prod-2")
    );
}

#[tokio::test]
async fn test_lifecycle_events() {
    let store = MemoryStore::new();
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);
    store.insert(document_in("prod", &[VerifyState::Restore]));
    rds.add_instance("dbsv-prod", "creating", &[]);

    let lifecycle = |id: &str| Trigger::Lifecycle {
        source_id: id.to_string(),
    };

    let outcome = invoke(&store, &sink, &rds, lifecycle("dbsv-prod")).await.unwrap();
    assert_eq!(advanced(&outcome), (VerifyState::Restore, VerifyState::Restore, 1));

    for unrelated in ["prod", "dbsv-unknown"] {
        let outcome = dispatch(&store, &sink, lifecycle(unrelated), |_region| async {
            Err::<FakeRds, _>(anyhow::anyhow!("unrelated events must not connect"))
        })
        .await
        .unwrap();
        assert!(matches!(outcome, Outcome::Ignored { .. }), "{unrelated}");
    }
}

#[tokio::test]
async fn test_file_store_carries_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state-doc-prod.json");
    let store = FileStore::new(&path);
    let sink = RecordingSink::new();
    let rds = FakeRds::new(REGION);
    rds.add_snapshot(fixtures::snapshot("rds:prod-1", "prod", 100.0, "automated"), &[]);

    let config: VerifyConfig = serde_json::from_value(json!({
        "database": "prod",
        "snapshot_region": REGION,
        "database_subnet_ids": "subnet-a,subnet-b",
        "state_doc_path": path,
    }))
    .unwrap();

    invoke(&store, &sink, &rds, Trigger::Config(config.clone()))
        .await
        .unwrap();

    let stored = store.load("prod").await.unwrap().unwrap().document;
    assert_eq!(stored.current_state(), VerifyState::Restore);
    assert_eq!(stored.database_subnet_ids, ["subnet-a", "subnet-b"]);
    assert_eq!(stored.state_doc_path.as_deref(), Some(path.as_path()));
    assert_eq!(
        stored
            .states()
            .iter()
            .map(|r| r.state)
            .collect::<Vec<_>>(),
        [VerifyState::Wait, VerifyState::Restore]
    );
}

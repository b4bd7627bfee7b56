//! Snapshot and database builders for tests

use chrono::{DateTime, Utc};
use dbsnap_rds::{Database, DatabaseInfo, Snapshot, SnapshotKind};

/// Account id used in every fake ARN
pub const ACCOUNT_ID: &str = "123456789012";

pub fn instance_arn(region: &str, id: &str) -> String {
    format!("arn:aws:rds:{region}:{ACCOUNT_ID}:db:{id}")
}

pub fn cluster_arn(region: &str, id: &str) -> String {
    format!("arn:aws:rds:{region}:{ACCOUNT_ID}:cluster:{id}")
}

pub fn snapshot_arn(region: &str, kind: SnapshotKind, id: &str) -> String {
    let resource = match kind {
        SnapshotKind::Instance => "snapshot",
        SnapshotKind::Cluster => "cluster-snapshot",
    };
    format!("arn:aws:rds:{region}:{ACCOUNT_ID}:{resource}:{id}")
}

pub fn subnet_group_arn(region: &str, name: &str) -> String {
    format!("arn:aws:rds:{region}:{ACCOUNT_ID}:subgrp:{name}")
}

/// Seconds since the epoch, fractional part kept
pub fn epoch(secs: f64) -> DateTime<Utc> {
    let whole = secs.trunc() as i64;
    let nanos = (secs.fract() * 1_000_000_000.0).round() as u32;
    DateTime::from_timestamp(whole, nanos).unwrap_or_default()
}

/// An instance snapshot in `us-east-1`.
///
/// `created` is only set when the snapshot is available, matching what
/// the provider reports.
pub fn snapshot(id: &str, database: &str, created: f64, snapshot_type: &str) -> Snapshot {
    Snapshot {
        id: id.to_string(),
        arn: snapshot_arn("us-east-1", SnapshotKind::Instance, id),
        status: "available".to_string(),
        created_time: Some(epoch(created)),
        snapshot_type: snapshot_type.to_string(),
        kind: SnapshotKind::Instance,
        source_database: database.to_string(),
        engine: Some("postgres".to_string()),
        kms_key_id: None,
    }
}

/// A snapshot still being created, without a creation time
pub fn pending_snapshot(id: &str, database: &str, snapshot_type: &str) -> Snapshot {
    Snapshot {
        status: "creating".to_string(),
        created_time: None,
        ..snapshot(id, database, 0.0, snapshot_type)
    }
}

/// A cluster snapshot in `us-east-1`
pub fn cluster_snapshot(id: &str, cluster: &str, created: f64) -> Snapshot {
    Snapshot {
        arn: snapshot_arn("us-east-1", SnapshotKind::Cluster, id),
        kind: SnapshotKind::Cluster,
        engine: Some("aurora-postgresql".to_string()),
        ..snapshot(id, cluster, created, "automated")
    }
}

pub fn instance(region: &str, id: &str, status: &str) -> Database {
    Database::Instance(DatabaseInfo {
        id: id.to_string(),
        arn: instance_arn(region, id),
        status: status.to_string(),
        engine: Some("postgres".to_string()),
        engine_version: Some("15.4".to_string()),
    })
}

pub fn cluster(region: &str, id: &str, status: &str, members: &[&str]) -> Database {
    Database::Cluster {
        info: DatabaseInfo {
            id: id.to_string(),
            arn: cluster_arn(region, id),
            status: status.to_string(),
            engine: Some("aurora-postgresql".to_string()),
            engine_version: Some("15.4".to_string()),
        },
        members: members.iter().map(|m| m.to_string()).collect(),
    }
}

//! Snapshot selection
//!
//! Lists, orders and filters snapshots for a database, and computes the
//! prune set for copies made by the copy tool.

use crate::error::RdsError;
use crate::operations::RdsOperations;
use crate::types::{Snapshot, SnapshotType};
use anyhow::Result;
use dbsnap_common::Marker;
use tracing::debug;

/// Available snapshots of a database, oldest first.
///
/// Tries instance snapshots first and falls back to cluster snapshots when
/// there are none.
pub async fn list_available<R: RdsOperations>(
    rds: &R,
    database: &str,
    snapshot_type: Option<SnapshotType>,
) -> Result<Vec<Snapshot>> {
    let mut snapshots = rds.describe_db_snapshots(database, snapshot_type).await?;
    if snapshots.is_empty() {
        snapshots = rds
            .describe_db_cluster_snapshots(database, snapshot_type)
            .await?;
    }
    Ok(order_available(snapshots))
}

/// Keep available snapshots that carry a creation time, sorted ascending.
///
/// Only available snapshots report a creation time, so the filter has to
/// come before the sort.
pub fn order_available(snapshots: Vec<Snapshot>) -> Vec<Snapshot> {
    let mut available: Vec<Snapshot> = snapshots
        .into_iter()
        .filter(|s| s.is_available() && s.created_time.is_some())
        .collect();
    available.sort_by_key(|s| s.created_time);
    available
}

/// Most recent available snapshot.
///
/// Fails with [`RdsError::NoSnapshotAvailable`] when there is none.
pub async fn latest<R: RdsOperations>(
    rds: &R,
    database: &str,
    snapshot_type: Option<SnapshotType>,
) -> Result<Snapshot> {
    list_available(rds, database, snapshot_type)
        .await?
        .pop()
        .ok_or_else(|| {
            RdsError::NoSnapshotAvailable {
                database: database.to_string(),
            }
            .into()
        })
}

/// Manual snapshots carrying the copy tool's provenance tag, oldest first
pub async fn self_created<R: RdsOperations>(rds: &R, database: &str) -> Result<Vec<Snapshot>> {
    let mut owned = Vec::new();
    for snapshot in list_available(rds, database, Some(SnapshotType::Manual)).await? {
        let tags = rds.list_tags(&snapshot.arn).await?;
        if Marker::COPY.is_present(&tags) {
            owned.push(snapshot);
        } else {
            debug!(snapshot_id = %snapshot.id, "Skipping snapshot not created by dbsnap-copy");
        }
    }
    Ok(owned)
}

/// Self-created snapshots older than the `keep` most recent
pub async fn prune_candidates<R: RdsOperations>(
    rds: &R,
    database: &str,
    keep: i64,
) -> Result<Vec<Snapshot>> {
    Ok(split_prunable(self_created(rds, database).await?, keep))
}

/// Oldest-first prefix of `snapshots` left after keeping the `keep` newest.
///
/// `keep <= 0` returns everything; `keep >= len` returns nothing.
pub fn split_prunable(mut snapshots: Vec<Snapshot>, keep: i64) -> Vec<Snapshot> {
    let keep = usize::try_from(keep).unwrap_or(0);
    let prune = snapshots.len().saturating_sub(keep);
    snapshots.truncate(prune);
    snapshots
}

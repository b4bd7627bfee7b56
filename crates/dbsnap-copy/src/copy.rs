//! Copy the latest automated snapshot and prune older copies

use crate::location::{Destination, Source, target_name};
use anyhow::Result;
use chrono::{DateTime, Utc};
use dbsnap_common::Marker;
use dbsnap_common::tags::{TAG_SOURCE_DB_IDENTIFIER, TAG_SOURCE_REGION, TAG_SOURCE_SNAPSHOT_ARN};
use dbsnap_rds::{CopySnapshotRequest, RdsOperations, Snapshot, SnapshotType, safety, snapshots};
use tracing::info;

/// Options for one copy run
#[derive(Debug, Clone, Default)]
pub struct CopyConfig {
    /// Log what would happen without mutating anything
    pub dry_run: bool,
    pub kms_key_id: Option<String>,
    /// Keep this many of the most recent copies; `None` or 0 disables
    /// pruning and a negative count prunes every copy
    pub prune_old: Option<i64>,
}

/// What a run did, or would have done in dry-run mode
#[derive(Debug, Clone)]
pub struct CopyReport {
    pub source_snapshot: Snapshot,
    pub target_id: String,
    pub region: String,
    /// The copy as reported by the provider; `None` in dry-run mode
    pub copy: Option<Snapshot>,
    pub pruned: Vec<Snapshot>,
}

/// Provenance tags attached to every copy
pub fn copy_tags(snapshot: &Snapshot, source: &Source) -> Vec<(String, String)> {
    let region = snapshot.region().unwrap_or(&source.region);
    vec![
        (TAG_SOURCE_SNAPSHOT_ARN.to_string(), snapshot.arn.clone()),
        (TAG_SOURCE_REGION.to_string(), region.to_string()),
        (TAG_SOURCE_DB_IDENTIFIER.to_string(), source.id.clone()),
        Marker::COPY.pair(),
    ]
}

/// Copy the latest automated snapshot of `source` into the destination,
/// then prune older copies there.
///
/// `source_rds` and `dest_rds` are sessions in the source and destination
/// regions; they may be the same session.
pub async fn copy_latest<S, D>(
    source_rds: &S,
    dest_rds: &D,
    source: &Source,
    destination: &Destination,
    config: &CopyConfig,
    now: DateTime<Utc>,
) -> Result<CopyReport>
where
    S: RdsOperations,
    D: RdsOperations,
{
    let snapshot =
        snapshots::latest(source_rds, &source.id, Some(SnapshotType::Automated)).await?;
    let target_id = target_name(destination, &snapshot.id, &source.region, now);
    let region = destination.region_or(&source.region).to_string();

    info!(
        source_arn = %snapshot.arn,
        target_id = %target_id,
        region = %region,
        dry_run = config.dry_run,
        "Copying snapshot"
    );

    let copy = if config.dry_run {
        info!(target_id = %target_id, "[DRY RUN] Would copy");
        None
    } else {
        let request = CopySnapshotRequest {
            tags: copy_tags(&snapshot, source),
            source: snapshot.clone(),
            target_id: target_id.clone(),
            kms_key_id: config.kms_key_id.clone(),
        };
        Some(dest_rds.copy_snapshot(&request).await?)
    };

    let pruned = match config.prune_old {
        Some(keep) if keep != 0 => prune(dest_rds, &source.id, keep, config.dry_run).await?,
        _ => Vec::new(),
    };

    Ok(CopyReport {
        source_snapshot: snapshot,
        target_id,
        region,
        copy,
        pruned,
    })
}

/// Delete self-created copies of `database` beyond the `keep` most recent.
/// A `keep` of zero or less deletes all of them.
///
/// Returns the snapshots deleted, or those that would be in dry-run mode.
pub async fn prune<R: RdsOperations>(
    rds: &R,
    database: &str,
    keep: i64,
    dry_run: bool,
) -> Result<Vec<Snapshot>> {
    let old = snapshots::prune_candidates(rds, database, keep).await?;
    info!(
        count = old.len(),
        keep,
        "Pruning old snapshots while keeping the most recent"
    );

    for snapshot in &old {
        if dry_run {
            info!(snapshot_id = %snapshot.id, "[DRY RUN] Would delete");
        } else {
            info!(snapshot_id = %snapshot.id, "Deleting old snapshot");
            safety::destroy_snapshot(rds, snapshot).await?;
        }
    }
    Ok(old)
}

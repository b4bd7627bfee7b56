//! Snapshot describe, copy and delete calls

use super::{RdsClient, sdk_tags, to_chrono};
use crate::types::{CopySnapshotRequest, Snapshot, SnapshotKind, SnapshotType};
use anyhow::{Context, Result};
use aws_sdk_rds::types::{DbClusterSnapshot, DbSnapshot};
use tracing::info;

impl RdsClient {
    /// All instance snapshots of a database, following pagination markers
    pub async fn describe_db_snapshots(
        &self,
        database: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .client
                .describe_db_snapshots()
                .db_instance_identifier(database)
                .set_snapshot_type(snapshot_type.map(|t| t.to_string()))
                .set_marker(marker.take())
                .send()
                .await
                .context("Failed to describe DB snapshots")?;

            snapshots.extend(response.db_snapshots().iter().filter_map(instance_snapshot));

            match response.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(snapshots)
    }

    /// All cluster snapshots of a database, following pagination markers
    pub async fn describe_db_cluster_snapshots(
        &self,
        database: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .client
                .describe_db_cluster_snapshots()
                .db_cluster_identifier(database)
                .set_snapshot_type(snapshot_type.map(|t| t.to_string()))
                .set_marker(marker.take())
                .send()
                .await
                .context("Failed to describe DB cluster snapshots")?;

            snapshots.extend(
                response
                    .db_cluster_snapshots()
                    .iter()
                    .filter_map(cluster_snapshot),
            );

            match response.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(snapshots)
    }

    /// Start copying a snapshot into this client's region.
    ///
    /// The source is addressed by ARN so cross-region copies work; the
    /// returned snapshot describes the copy in its initial state.
    pub async fn copy_snapshot(&self, request: &CopySnapshotRequest) -> Result<Snapshot> {
        let source = &request.source;
        // Same-region copies must not name a source region.
        let source_region = source
            .region()
            .filter(|r| *r != self.region())
            .map(str::to_string);
        info!(
            source_arn = %source.arn,
            target_id = %request.target_id,
            region = %self.region(),
            "Copying snapshot"
        );

        let copy = match source.kind {
            SnapshotKind::Instance => {
                let response = self
                    .client
                    .copy_db_snapshot()
                    .source_db_snapshot_identifier(&source.arn)
                    .target_db_snapshot_identifier(&request.target_id)
                    .set_kms_key_id(request.kms_key_id.clone())
                    .set_tags(Some(sdk_tags(&request.tags)))
                    .send()
                    .await
                    .context("Failed to copy DB snapshot")?;
                response.db_snapshot().and_then(instance_snapshot)
            }
            SnapshotKind::Cluster => {
                let response = self
                    .client
                    .copy_db_cluster_snapshot()
                    .source_db_cluster_snapshot_identifier(&source.arn)
                    .target_db_cluster_snapshot_identifier(&request.target_id)
                    .set_kms_key_id(request.kms_key_id.clone())
                    .set_tags(Some(sdk_tags(&request.tags)))
                    .send()
                    .await
                    .context("Failed to copy DB cluster snapshot")?;
                response.db_cluster_snapshot().and_then(cluster_snapshot)
            }
        };

        copy.context("Copy response did not describe the new snapshot")
    }

    pub async fn delete_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        match snapshot.kind {
            SnapshotKind::Instance => {
                self.client
                    .delete_db_snapshot()
                    .db_snapshot_identifier(&snapshot.id)
                    .send()
                    .await
                    .context("Failed to delete DB snapshot")?;
            }
            SnapshotKind::Cluster => {
                self.client
                    .delete_db_cluster_snapshot()
                    .db_cluster_snapshot_identifier(&snapshot.id)
                    .send()
                    .await
                    .context("Failed to delete DB cluster snapshot")?;
            }
        }
        info!(snapshot_id = %snapshot.id, "Snapshot deleted");
        Ok(())
    }
}

fn instance_snapshot(s: &DbSnapshot) -> Option<Snapshot> {
    Some(Snapshot {
        id: s.db_snapshot_identifier()?.to_string(),
        arn: s.db_snapshot_arn().unwrap_or_default().to_string(),
        status: s.status().unwrap_or_default().to_string(),
        created_time: s.snapshot_create_time().and_then(to_chrono),
        snapshot_type: s.snapshot_type().unwrap_or_default().to_string(),
        kind: SnapshotKind::Instance,
        source_database: s.db_instance_identifier().unwrap_or_default().to_string(),
        engine: s.engine().map(str::to_string),
        kms_key_id: s.kms_key_id().map(str::to_string),
    })
}

fn cluster_snapshot(s: &DbClusterSnapshot) -> Option<Snapshot> {
    Some(Snapshot {
        id: s.db_cluster_snapshot_identifier()?.to_string(),
        arn: s.db_cluster_snapshot_arn().unwrap_or_default().to_string(),
        status: s.status().unwrap_or_default().to_string(),
        created_time: s.snapshot_create_time().and_then(to_chrono),
        snapshot_type: s.snapshot_type().unwrap_or_default().to_string(),
        kind: SnapshotKind::Cluster,
        source_database: s.db_cluster_identifier().unwrap_or_default().to_string(),
        engine: s.engine().map(str::to_string),
        kms_key_id: s.kms_key_id().map(str::to_string),
    })
}

//! Instance and cluster lifecycle calls

use super::{RdsClient, sdk_tags};
use crate::error::ignore_not_found;
use crate::types::{
    ClusterMemberRequest, Database, DatabaseInfo, EventSourceType, ModifyRequest, RestoreRequest,
    SnapshotKind,
};
use anyhow::{Context, Result};
use aws_sdk_rds::types::{DbCluster, DbInstance, SourceType};
use tracing::{debug, info};

impl RdsClient {
    /// Describe a standalone instance, `None` if it does not exist
    pub async fn describe_db_instance(&self, id: &str) -> Result<Option<Database>> {
        let result = self
            .client
            .describe_db_instances()
            .db_instance_identifier(id)
            .send()
            .await;

        let Some(response) = ignore_not_found(result).context("Failed to describe DB instance")?
        else {
            debug!(db_id = %id, "DB instance not found");
            return Ok(None);
        };

        Ok(response.db_instances().first().and_then(instance_from_sdk))
    }

    /// Describe a cluster with its member ids, `None` if it does not exist
    pub async fn describe_db_cluster(&self, id: &str) -> Result<Option<Database>> {
        let result = self
            .client
            .describe_db_clusters()
            .db_cluster_identifier(id)
            .send()
            .await;

        let Some(response) = ignore_not_found(result).context("Failed to describe DB cluster")?
        else {
            debug!(db_id = %id, "DB cluster not found");
            return Ok(None);
        };

        Ok(response.db_clusters().first().and_then(cluster_from_sdk))
    }

    /// Restore a snapshot into a new instance, or a cluster shell without members
    pub async fn restore_from_snapshot(&self, request: &RestoreRequest) -> Result<()> {
        let snapshot = &request.snapshot;
        info!(
            target_id = %request.target_id,
            snapshot_id = %snapshot.id,
            kind = %snapshot.kind,
            "Restoring snapshot"
        );

        match snapshot.kind {
            SnapshotKind::Instance => {
                self.client
                    .restore_db_instance_from_db_snapshot()
                    .db_instance_identifier(&request.target_id)
                    .db_snapshot_identifier(&snapshot.id)
                    .db_subnet_group_name(&request.subnet_group)
                    .publicly_accessible(false)
                    .multi_az(false)
                    .set_tags(Some(sdk_tags(&request.tags)))
                    .send()
                    .await
                    .context("Failed to restore DB instance from snapshot")?;
            }
            SnapshotKind::Cluster => {
                let engine = snapshot
                    .engine
                    .as_deref()
                    .context("Cluster snapshot does not report an engine")?;
                self.client
                    .restore_db_cluster_from_snapshot()
                    .db_cluster_identifier(&request.target_id)
                    .snapshot_identifier(&snapshot.id)
                    .engine(engine)
                    .db_subnet_group_name(&request.subnet_group)
                    .set_tags(Some(sdk_tags(&request.tags)))
                    .send()
                    .await
                    .context("Failed to restore DB cluster from snapshot")?;
            }
        }

        Ok(())
    }

    /// Create a member instance inside an existing cluster
    pub async fn create_db_instance_in_cluster(
        &self,
        request: &ClusterMemberRequest,
    ) -> Result<()> {
        info!(
            instance_id = %request.instance_id,
            cluster_id = %request.cluster_id,
            instance_class = %request.instance_class,
            "Creating cluster member instance"
        );

        self.client
            .create_db_instance()
            .db_instance_identifier(&request.instance_id)
            .db_cluster_identifier(&request.cluster_id)
            .engine(&request.engine)
            .set_engine_version(request.engine_version.clone())
            .db_instance_class(&request.instance_class)
            .set_tags(Some(sdk_tags(&request.tags)))
            .send()
            .await
            .context("Failed to create cluster member instance")?;

        Ok(())
    }

    /// Apply the verification password and security groups immediately.
    ///
    /// Instances also get backup retention disabled; clusters keep theirs
    /// since the setting is cluster-wide.
    pub async fn modify_for_verification(
        &self,
        database: &Database,
        request: &ModifyRequest,
    ) -> Result<()> {
        let security_groups =
            (!request.security_group_ids.is_empty()).then(|| request.security_group_ids.clone());

        match database {
            Database::Instance(info) => {
                self.client
                    .modify_db_instance()
                    .db_instance_identifier(&info.id)
                    .apply_immediately(true)
                    .backup_retention_period(0)
                    .master_user_password(&request.master_password)
                    .set_vpc_security_group_ids(security_groups)
                    .send()
                    .await
                    .context("Failed to modify DB instance")?;
            }
            Database::Cluster { info, .. } => {
                self.client
                    .modify_db_cluster()
                    .db_cluster_identifier(&info.id)
                    .apply_immediately(true)
                    .master_user_password(&request.master_password)
                    .set_vpc_security_group_ids(security_groups)
                    .send()
                    .await
                    .context("Failed to modify DB cluster")?;
            }
        }

        info!(db_id = %database.id(), kind = database.kind(), "Modified database for verification");
        Ok(())
    }

    /// Delete an instance without a final snapshot
    pub async fn delete_db_instance(&self, id: &str) -> Result<()> {
        self.client
            .delete_db_instance()
            .db_instance_identifier(id)
            .skip_final_snapshot(true)
            .send()
            .await
            .context("Failed to delete DB instance")?;
        info!(db_id = %id, "DB instance deletion started");
        Ok(())
    }

    /// Delete a cluster without a final snapshot
    pub async fn delete_db_cluster(&self, id: &str) -> Result<()> {
        self.client
            .delete_db_cluster()
            .db_cluster_identifier(id)
            .skip_final_snapshot(true)
            .send()
            .await
            .context("Failed to delete DB cluster")?;
        info!(db_id = %id, "DB cluster deletion started");
        Ok(())
    }

    /// Event messages recorded for a resource in the look-back window
    pub async fn event_messages(
        &self,
        source_id: &str,
        source_type: EventSourceType,
        duration_minutes: i32,
    ) -> Result<Vec<String>> {
        let source_type = match source_type {
            EventSourceType::DbInstance => SourceType::DbInstance,
            EventSourceType::DbCluster => SourceType::DbCluster,
        };

        let mut messages = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .client
                .describe_events()
                .source_identifier(source_id)
                .source_type(source_type.clone())
                .duration(duration_minutes)
                .set_marker(marker.take())
                .send()
                .await
                .context("Failed to describe events")?;

            messages.extend(
                response
                    .events()
                    .iter()
                    .filter_map(|e| e.message().map(str::to_string)),
            );

            match response.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(messages)
    }
}

fn instance_from_sdk(db: &DbInstance) -> Option<Database> {
    Some(Database::Instance(DatabaseInfo {
        id: db.db_instance_identifier()?.to_string(),
        arn: db.db_instance_arn().unwrap_or_default().to_string(),
        status: db.db_instance_status().unwrap_or_default().to_string(),
        engine: db.engine().map(str::to_string),
        engine_version: db.engine_version().map(str::to_string),
    }))
}

fn cluster_from_sdk(db: &DbCluster) -> Option<Database> {
    let info = DatabaseInfo {
        id: db.db_cluster_identifier()?.to_string(),
        arn: db.db_cluster_arn().unwrap_or_default().to_string(),
        status: db.status().unwrap_or_default().to_string(),
        engine: db.engine().map(str::to_string),
        engine_version: db.engine_version().map(str::to_string),
    };
    let members = db
        .db_cluster_members()
        .iter()
        .filter_map(|m| m.db_instance_identifier().map(str::to_string))
        .collect();
    Some(Database::Cluster { info, members })
}

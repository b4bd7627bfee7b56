//! RDS operations trait for testing

use crate::client::RdsClient;
use crate::types::{
    ClusterMemberRequest, CopySnapshotRequest, Database, EventSourceType, ModifyRequest,
    RestoreRequest, Snapshot, SnapshotType, SubnetGroup, SubnetGroupRequest,
};
use anyhow::Result;
use dbsnap_common::Tags;

/// Trait for the RDS calls the verifier and copy tool make.
///
/// This trait abstracts the RDS client so state handlers and snapshot
/// selection can be unit tested without hitting real AWS. Describe calls
/// return `Ok(None)` for a missing identifier rather than an error.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait RdsOperations: Send + Sync {
    /// Region the session is bound to
    fn region(&self) -> String;

    /// Describe a standalone instance
    async fn describe_db_instance(&self, id: &str) -> Result<Option<Database>>;

    /// Describe a cluster along with its member ids
    async fn describe_db_cluster(&self, id: &str) -> Result<Option<Database>>;

    /// All instance snapshots of a database, optionally filtered by type
    async fn describe_db_snapshots(
        &self,
        database: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<Snapshot>>;

    /// All cluster snapshots of a database, optionally filtered by type
    async fn describe_db_cluster_snapshots(
        &self,
        database: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<Snapshot>>;

    /// Tags currently attached to a resource
    async fn list_tags(&self, arn: &str) -> Result<Tags>;

    /// Restore a snapshot into a new instance or cluster shell
    async fn restore_from_snapshot(&self, request: &RestoreRequest) -> Result<()>;

    /// Create a member instance inside an existing cluster
    async fn create_db_instance_in_cluster(&self, request: &ClusterMemberRequest) -> Result<()>;

    /// Apply the verification password and security groups
    async fn modify_for_verification(
        &self,
        database: &Database,
        request: &ModifyRequest,
    ) -> Result<()>;

    /// Delete an instance without a final snapshot
    async fn delete_db_instance(&self, id: &str) -> Result<()>;

    /// Delete a cluster without a final snapshot
    async fn delete_db_cluster(&self, id: &str) -> Result<()>;

    async fn describe_subnet_group(&self, name: &str) -> Result<Option<SubnetGroup>>;

    async fn create_subnet_group(&self, request: &SubnetGroupRequest) -> Result<SubnetGroup>;

    async fn delete_subnet_group(&self, name: &str) -> Result<()>;

    /// Event messages recorded for a resource within the look-back window
    async fn event_messages(
        &self,
        source_id: &str,
        source_type: EventSourceType,
        duration_minutes: i32,
    ) -> Result<Vec<String>>;

    /// Start copying a snapshot into this session's region
    async fn copy_snapshot(&self, request: &CopySnapshotRequest) -> Result<Snapshot>;

    async fn delete_snapshot(&self, snapshot: &Snapshot) -> Result<()>;
}

impl RdsOperations for RdsClient {
    fn region(&self) -> String {
        RdsClient::region(self).to_string()
    }

    async fn describe_db_instance(&self, id: &str) -> Result<Option<Database>> {
        RdsClient::describe_db_instance(self, id).await
    }

    async fn describe_db_cluster(&self, id: &str) -> Result<Option<Database>> {
        RdsClient::describe_db_cluster(self, id).await
    }

    async fn describe_db_snapshots(
        &self,
        database: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<Snapshot>> {
        RdsClient::describe_db_snapshots(self, database, snapshot_type).await
    }

    async fn describe_db_cluster_snapshots(
        &self,
        database: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<Snapshot>> {
        RdsClient::describe_db_cluster_snapshots(self, database, snapshot_type).await
    }

    async fn list_tags(&self, arn: &str) -> Result<Tags> {
        RdsClient::list_tags(self, arn).await
    }

    async fn restore_from_snapshot(&self, request: &RestoreRequest) -> Result<()> {
        RdsClient::restore_from_snapshot(self, request).await
    }

    async fn create_db_instance_in_cluster(&self, request: &ClusterMemberRequest) -> Result<()> {
        RdsClient::create_db_instance_in_cluster(self, request).await
    }

    async fn modify_for_verification(
        &self,
        database: &Database,
        request: &ModifyRequest,
    ) -> Result<()> {
        RdsClient::modify_for_verification(self, database, request).await
    }

    async fn delete_db_instance(&self, id: &str) -> Result<()> {
        RdsClient::delete_db_instance(self, id).await
    }

    async fn delete_db_cluster(&self, id: &str) -> Result<()> {
        RdsClient::delete_db_cluster(self, id).await
    }

    async fn describe_subnet_group(&self, name: &str) -> Result<Option<SubnetGroup>> {
        RdsClient::describe_subnet_group(self, name).await
    }

    async fn create_subnet_group(&self, request: &SubnetGroupRequest) -> Result<SubnetGroup> {
        RdsClient::create_subnet_group(self, request).await
    }

    async fn delete_subnet_group(&self, name: &str) -> Result<()> {
        RdsClient::delete_subnet_group(self, name).await
    }

    async fn event_messages(
        &self,
        source_id: &str,
        source_type: EventSourceType,
        duration_minutes: i32,
    ) -> Result<Vec<String>> {
        RdsClient::event_messages(self, source_id, source_type, duration_minutes).await
    }

    async fn copy_snapshot(&self, request: &CopySnapshotRequest) -> Result<Snapshot> {
        RdsClient::copy_snapshot(self, request).await
    }

    async fn delete_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        RdsClient::delete_snapshot(self, snapshot).await
    }
}

//! RDS resource types and request shapes

use crate::error::RdsError;
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Status string reported for resources ready for use
pub const STATUS_AVAILABLE: &str = "available";

/// Identity and lifecycle fields shared by instances and clusters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub id: String,
    pub arn: String,
    pub status: String,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
}

/// A standalone instance or a cluster with its member instance ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
    Instance(DatabaseInfo),
    Cluster {
        info: DatabaseInfo,
        members: Vec<String>,
    },
}

impl Database {
    pub fn info(&self) -> &DatabaseInfo {
        match self {
            Database::Instance(info) => info,
            Database::Cluster { info, .. } => info,
        }
    }

    pub fn id(&self) -> &str {
        &self.info().id
    }

    pub fn arn(&self) -> &str {
        &self.info().arn
    }

    pub fn status(&self) -> &str {
        &self.info().status
    }

    pub fn is_available(&self) -> bool {
        self.status() == STATUS_AVAILABLE
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, Database::Cluster { .. })
    }

    /// Member instance ids; empty for a standalone instance
    pub fn members(&self) -> &[String] {
        match self {
            Database::Instance(_) => &[],
            Database::Cluster { members, .. } => members,
        }
    }

    /// Region parsed from the ARN, if the ARN is well formed
    pub fn region(&self) -> Option<&str> {
        arn_region(self.arn())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Database::Instance(_) => "instance",
            Database::Cluster { .. } => "cluster",
        }
    }
}

/// Region field (index 3) of an ARN: `arn:partition:service:region:...`
pub fn arn_region(arn: &str) -> Option<&str> {
    arn.split(':').nth(3).filter(|r| !r.is_empty())
}

/// Whether a snapshot belongs to a standalone instance or a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SnapshotKind {
    Instance,
    Cluster,
}

/// Snapshot type filter accepted by the describe calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SnapshotType {
    Automated,
    Manual,
}

impl FromStr for SnapshotType {
    type Err = RdsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "automated" => Ok(Self::Automated),
            "manual" => Ok(Self::Manual),
            other => Err(RdsError::InvalidSnapshotType(other.to_string())),
        }
    }
}

/// A point-in-time snapshot of an instance or cluster
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: String,
    pub arn: String,
    pub status: String,
    pub created_time: Option<DateTime<Utc>>,
    /// Provider-reported type (automated, manual, shared...)
    pub snapshot_type: String,
    pub kind: SnapshotKind,
    /// Identifier of the database the snapshot was taken from
    pub source_database: String,
    pub engine: Option<String>,
    pub kms_key_id: Option<String>,
}

impl Snapshot {
    pub fn is_available(&self) -> bool {
        self.status == STATUS_AVAILABLE
    }

    pub fn region(&self) -> Option<&str> {
        arn_region(&self.arn)
    }
}

/// A DB subnet group as seen by the verifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetGroup {
    pub name: String,
    pub arn: String,
    pub status: String,
}

/// Restore a snapshot into a new database
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreRequest {
    pub target_id: String,
    pub snapshot: Snapshot,
    pub subnet_group: String,
    pub tags: Vec<(String, String)>,
}

/// Provision a member instance inside a restored cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMemberRequest {
    pub instance_id: String,
    pub cluster_id: String,
    pub engine: String,
    pub engine_version: Option<String>,
    pub instance_class: String,
    pub tags: Vec<(String, String)>,
}

/// Settings applied to a restored database before verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    pub master_password: String,
    pub security_group_ids: Vec<String>,
}

/// Create a DB subnet group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetGroupRequest {
    pub name: String,
    pub description: String,
    pub subnet_ids: Vec<String>,
    pub tags: Vec<(String, String)>,
}

/// Copy a snapshot, possibly across regions
#[derive(Debug, Clone, PartialEq)]
pub struct CopySnapshotRequest {
    pub source: Snapshot,
    pub target_id: String,
    pub kms_key_id: Option<String>,
    pub tags: Vec<(String, String)>,
}

/// Event source filter for the describe-events call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum EventSourceType {
    DbInstance,
    DbCluster,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, arn: &str, status: &str) -> DatabaseInfo {
        DatabaseInfo {
            id: id.to_string(),
            arn: arn.to_string(),
            status: status.to_string(),
            engine: Some("postgres".to_string()),
            engine_version: None,
        }
    }

    #[test]
    fn test_region_from_arn() {
        let db = Database::Instance(info(
            "prod",
            "arn:aws:rds:us-west-2:123456789012:db:prod",
            "available",
        ));
        assert_eq!(db.region(), Some("us-west-2"));
        assert!(db.is_available());
        assert_eq!(db.kind(), "instance");
    }

    #[test]
    fn test_malformed_arn_has_no_region() {
        assert_eq!(arn_region("not-an-arn"), None);
        assert_eq!(arn_region("arn:aws:rds::"), None);
    }

    #[test]
    fn test_cluster_members() {
        let db = Database::Cluster {
            info: info("c", "arn:aws:rds:us-east-1:1:cluster:c", "creating"),
            members: vec!["i-c".to_string()],
        };
        assert!(db.is_cluster());
        assert!(!db.is_available());
        assert_eq!(db.members(), ["i-c".to_string()]);
    }

    #[test]
    fn test_snapshot_type_parse() {
        assert_eq!(
            "automated".parse::<SnapshotType>().unwrap(),
            SnapshotType::Automated
        );
        assert_eq!("manual".parse::<SnapshotType>().unwrap(), SnapshotType::Manual);
        let err = "weekly".parse::<SnapshotType>().unwrap_err();
        assert!(matches!(err, RdsError::InvalidSnapshotType(t) if t == "weekly"));
    }

    #[test]
    fn test_event_source_names() {
        assert_eq!(EventSourceType::DbInstance.to_string(), "db-instance");
        assert_eq!(EventSourceType::DbCluster.to_string(), "db-cluster");
    }
}

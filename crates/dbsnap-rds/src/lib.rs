//! dbsnap-rds - RDS access for the dbsnap tools
//!
//! Wraps the AWS SDK behind [`RdsOperations`] and builds the resource-level
//! operations both tools need on top of it.
//!
//! ## Modules
//!
//! - [`client`]: SDK-backed [`RdsClient`]
//! - [`context`]: Shared AWS configuration
//! - [`database`]: Instance/cluster describe, modify and member provisioning
//! - [`error`]: Error classification
//! - [`safety`]: Marker-gated deletes
//! - [`snapshots`]: Snapshot listing, selection and pruning
//! - [`subnet_group`]: Temporary subnet group lifecycle

pub mod client;
pub mod context;
pub mod database;
pub mod error;
pub mod operations;
pub mod safety;
pub mod snapshots;
pub mod subnet_group;
pub mod types;

pub use client::RdsClient;
pub use context::{AwsContext, FromAwsContext};
pub use error::{RdsError, classify_anyhow_error, classify_aws_error, ignore_not_found};
pub use operations::RdsOperations;
pub use types::{
    ClusterMemberRequest, CopySnapshotRequest, Database, DatabaseInfo, EventSourceType,
    ModifyRequest, RestoreRequest, Snapshot, SnapshotKind, SnapshotType, SubnetGroup,
    SubnetGroupRequest,
};

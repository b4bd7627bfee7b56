//! Temporary subnet group lifecycle
//!
//! Each restore gets a fresh subnet group named after the temporary
//! database, so the copy lands in an isolated network placement.

use crate::error::classify_anyhow_error;
use crate::operations::RdsOperations;
use crate::safety;
use crate::types::{SubnetGroup, SubnetGroupRequest};
use anyhow::Result;
use backon::{ExponentialBuilder, Retryable};
use dbsnap_common::tags::verify_resource_tags;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Create the subnet group for a restore, replacing a stale one of the same name.
///
/// The stale group is only removed when it carries the verifier's marker.
pub async fn prepare_subnet_group<R: RdsOperations>(
    rds: &R,
    name: &str,
    subnet_ids: &[String],
) -> Result<SubnetGroup> {
    if let Some(stale) = rds.describe_subnet_group(name).await? {
        info!(subnet_group = %name, "Replacing stale subnet group");
        release(rds, &stale).await?;
    }

    rds.create_subnet_group(&SubnetGroupRequest {
        name: name.to_string(),
        description: name.to_string(),
        subnet_ids: subnet_ids.to_vec(),
        tags: verify_resource_tags(name),
    })
    .await
}

/// Delete the subnet group for a finished cycle; a missing group is a no-op.
pub async fn release_subnet_group<R: RdsOperations>(rds: &R, name: &str) -> Result<()> {
    match rds.describe_subnet_group(name).await? {
        Some(group) => release(rds, &group).await,
        None => {
            debug!(subnet_group = %name, "Subnet group already released");
            Ok(())
        }
    }
}

/// Guarded delete, retried while the group is still attached to a
/// database that is being torn down.
async fn release<R: RdsOperations>(rds: &R, group: &SubnetGroup) -> Result<()> {
    (|| async { safety::destroy_subnet_group(rds, group).await })
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(2))
                .with_max_delay(Duration::from_secs(20))
                .with_max_times(4),
        )
        .when(|e| classify_anyhow_error(e).is_retryable())
        .notify(|e, dur| {
            warn!(
                subnet_group = %group.name,
                delay = ?dur,
                error = %e,
                "Subnet group deletion failed, retrying..."
            );
        })
        .await
}

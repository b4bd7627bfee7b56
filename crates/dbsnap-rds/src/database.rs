//! Instance/cluster resource operations
//!
//! Composes the raw [`RdsOperations`] calls into the resource-level
//! operations the state handlers use: describe-by-identifier across both
//! shapes, cluster member provisioning, and the verification modify step.

use crate::operations::RdsOperations;
use crate::types::{ClusterMemberRequest, Database, EventSourceType, ModifyRequest};
use anyhow::{Context, Result};
use dbsnap_common::Tags;
use dbsnap_common::tags::verify_resource_tags;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info};

/// Length of the generated verification password
pub const PASSWORD_LENGTH: usize = 16;

/// Event-log look-back window, in minutes
pub const EVENT_WINDOW_MINUTES: i32 = 1440;

/// Event message RDS records once a modify has applied the new password
pub const CREDENTIALS_RESET_EVENT: &str = "Reset master credentials";

/// Describe a database by identifier, trying the instance shape first.
///
/// Returns `None` when neither an instance nor a cluster exists.
pub async fn describe<R: RdsOperations>(rds: &R, identifier: &str) -> Result<Option<Database>> {
    if let Some(db) = rds.describe_db_instance(identifier).await? {
        return Ok(Some(db));
    }
    let cluster = rds.describe_db_cluster(identifier).await?;
    if cluster.is_none() {
        debug!(db_id = %identifier, "No instance or cluster found");
    }
    Ok(cluster)
}

/// Tags currently attached to the database
pub async fn tags<R: RdsOperations>(rds: &R, database: &Database) -> Result<Tags> {
    rds.list_tags(database.arn()).await
}

/// Whether the first member of a cluster is available.
///
/// `None` for a cluster shell without members; a member that cannot be
/// described counts as not available.
pub async fn first_member_available<R: RdsOperations>(
    rds: &R,
    database: &Database,
) -> Result<Option<bool>> {
    let Some(member) = database.members().first() else {
        return Ok(None);
    };
    let available = rds
        .describe_db_instance(member)
        .await?
        .is_some_and(|m| m.is_available());
    Ok(Some(available))
}

/// Provision the member instance of a restored cluster shell
pub async fn create_member_instance<R: RdsOperations>(
    rds: &R,
    cluster: &Database,
    member_id: &str,
    instance_class: &str,
) -> Result<()> {
    let engine = cluster
        .info()
        .engine
        .clone()
        .context("Cluster does not report an engine")?;

    rds.create_db_instance_in_cluster(&ClusterMemberRequest {
        instance_id: member_id.to_string(),
        cluster_id: cluster.id().to_string(),
        engine,
        engine_version: cluster.info().engine_version.clone(),
        instance_class: instance_class.to_string(),
        tags: verify_resource_tags(member_id),
    })
    .await
}

/// Apply a fresh password and the verification security groups.
///
/// Returns the plaintext password; the caller owns its lifetime.
pub async fn modify_for_verification<R: RdsOperations>(
    rds: &R,
    database: &Database,
    security_group_ids: &[String],
) -> Result<String> {
    let password = generate_password(PASSWORD_LENGTH);
    rds.modify_for_verification(
        database,
        &ModifyRequest {
            master_password: password.clone(),
            security_group_ids: security_group_ids.to_vec(),
        },
    )
    .await?;
    info!(db_id = %database.id(), "Applied verification credentials");
    Ok(password)
}

/// Recent event messages for the database under both event source types
pub async fn event_messages<R: RdsOperations>(
    rds: &R,
    database: &Database,
) -> Result<Vec<String>> {
    let mut messages = rds
        .event_messages(database.id(), EventSourceType::DbInstance, EVENT_WINDOW_MINUTES)
        .await?;
    messages.extend(
        rds.event_messages(database.id(), EventSourceType::DbCluster, EVENT_WINDOW_MINUTES)
            .await?,
    );
    Ok(messages)
}

/// Whether the event log shows the verification password was applied
pub fn credentials_reset(messages: &[String]) -> bool {
    messages.iter().any(|m| m.trim() == CREDENTIALS_RESET_EVENT)
}

/// Random alphanumeric password
pub fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

//! Safety gate for destructive calls
//!
//! Every delete issued by the tools goes through this module. Each guarded
//! call re-reads the resource's tags from the provider and refuses unless
//! the expected [`Marker`] is present with its exact value.

use crate::error::RdsError;
use crate::operations::RdsOperations;
use crate::types::{Database, Snapshot, SubnetGroup};
use anyhow::Result;
use dbsnap_common::{Marker, Tags};
use tracing::{info, warn};

/// Refuse unless `tags` carry `marker`.
pub fn require_marker(
    tags: &Tags,
    marker: &Marker,
    resource_type: &'static str,
    resource_id: &str,
) -> Result<(), RdsError> {
    if marker.is_present(tags) {
        return Ok(());
    }
    warn!(
        resource_type,
        resource_id,
        marker_key = marker.key,
        "Refusing to delete resource without marker tag"
    );
    Err(RdsError::SafetyRefusal {
        resource_type,
        resource_id: resource_id.to_string(),
        marker: format!("{}={}", marker.key, marker.value),
    })
}

/// Delete a temporary database created by the verifier.
///
/// Clusters have their member instances deleted first, then the cluster.
pub async fn destroy_database<R: RdsOperations>(rds: &R, database: &Database) -> Result<()> {
    let tags = rds.list_tags(database.arn()).await?;
    require_marker(&tags, &Marker::VERIFY, "database", database.id())?;

    match database {
        Database::Instance(info) => {
            rds.delete_db_instance(&info.id).await?;
        }
        Database::Cluster { info, members } => {
            for member in members {
                rds.delete_db_instance(member).await?;
            }
            rds.delete_db_cluster(&info.id).await?;
        }
    }

    info!(db_id = %database.id(), kind = database.kind(), "Destroy of temporary database started");
    Ok(())
}

/// Delete a subnet group created by the verifier
pub async fn destroy_subnet_group<R: RdsOperations>(rds: &R, group: &SubnetGroup) -> Result<()> {
    let tags = rds.list_tags(&group.arn).await?;
    require_marker(&tags, &Marker::VERIFY, "subnet group", &group.name)?;
    rds.delete_subnet_group(&group.name).await
}

/// Delete a snapshot copy created by the copy tool
pub async fn destroy_snapshot<R: RdsOperations>(rds: &R, snapshot: &Snapshot) -> Result<()> {
    let tags = rds.list_tags(&snapshot.arn).await?;
    require_marker(&tags, &Marker::COPY, "snapshot", &snapshot.id)?;
    rds.delete_snapshot(snapshot).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::MockRdsOperations;
    use crate::types::{DatabaseInfo, SnapshotKind};

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn instance() -> Database {
        Database::Instance(DatabaseInfo {
            id: "dbsv-prod".to_string(),
            arn: "arn:aws:rds:us-east-1:123456789012:db:dbsv-prod".to_string(),
            status: "available".to_string(),
            engine: Some("postgres".to_string()),
            engine_version: None,
        })
    }

    fn cluster() -> Database {
        Database::Cluster {
            info: DatabaseInfo {
                id: "dbsv-aurora".to_string(),
                arn: "arn:aws:rds:us-east-1:123456789012:cluster:dbsv-aurora".to_string(),
                status: "available".to_string(),
                engine: Some("aurora-mysql".to_string()),
                engine_version: None,
            },
            members: vec!["i-dbsv-aurora".to_string()],
        }
    }

    #[test]
    fn test_require_marker() {
        let ok = tags(&[("dbsnap-verify", "true")]);
        assert!(require_marker(&ok, &Marker::VERIFY, "database", "x").is_ok());

        let wrong = tags(&[("dbsnap-verify", "yes")]);
        let err = require_marker(&wrong, &Marker::VERIFY, "database", "x").unwrap_err();
        assert!(matches!(
            err,
            RdsError::SafetyRefusal { ref resource_id, .. } if resource_id == "x"
        ));
        assert!(err.to_string().contains("dbsnap-verify=true"));
    }

    #[tokio::test]
    async fn test_destroy_refuses_without_marker() {
        let mut mock = MockRdsOperations::new();
        mock.expect_list_tags()
            .returning(|_| Ok(tags(&[("Name", "dbsv-prod")])));
        mock.expect_delete_db_instance().never();
        mock.expect_delete_db_cluster().never();

        let err = destroy_database(&mock, &instance()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RdsError>(),
            Some(RdsError::SafetyRefusal { .. })
        ));
    }

    #[tokio::test]
    async fn test_destroy_instance_with_marker_deletes_once() {
        let mut mock = MockRdsOperations::new();
        mock.expect_list_tags()
            .withf(|arn| arn.ends_with(":db:dbsv-prod"))
            .returning(|_| Ok(tags(&[("dbsnap-verify", "true")])));
        mock.expect_delete_db_instance()
            .withf(|id| id == "dbsv-prod")
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_delete_db_cluster().never();

        destroy_database(&mock, &instance()).await.unwrap();
    }

    #[tokio::test]
    async fn test_destroy_cluster_deletes_members_then_cluster() {
        let mut seq = mockall::Sequence::new();
        let mut mock = MockRdsOperations::new();
        mock.expect_list_tags()
            .returning(|_| Ok(tags(&[("dbsnap-verify", "true")])));
        mock.expect_delete_db_instance()
            .withf(|id| id == "i-dbsv-aurora")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_delete_db_cluster()
            .withf(|id| id == "dbsv-aurora")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        destroy_database(&mock, &cluster()).await.unwrap();
    }

    #[tokio::test]
    async fn test_destroy_snapshot_requires_copy_marker() {
        let snapshot = Snapshot {
            id: "prod-copy".to_string(),
            arn: "arn:aws:rds:us-west-2:123456789012:snapshot:prod-copy".to_string(),
            status: "available".to_string(),
            created_time: None,
            snapshot_type: "manual".to_string(),
            kind: SnapshotKind::Instance,
            source_database: "prod".to_string(),
            engine: None,
            kms_key_id: None,
        };

        let mut refused = MockRdsOperations::new();
        refused
            .expect_list_tags()
            .returning(|_| Ok(tags(&[("created_by", "someone-else")])));
        refused.expect_delete_snapshot().never();
        assert!(destroy_snapshot(&refused, &snapshot).await.is_err());

        let mut allowed = MockRdsOperations::new();
        allowed
            .expect_list_tags()
            .returning(|_| Ok(tags(&[("created_by", "dbsnap-copy")])));
        allowed
            .expect_delete_snapshot()
            .times(1)
            .returning(|_| Ok(()));
        destroy_snapshot(&allowed, &snapshot).await.unwrap();
    }
}

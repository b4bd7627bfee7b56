//! DB subnet group calls

use super::{RdsClient, sdk_tags};
use crate::error::ignore_not_found;
use crate::types::{SubnetGroup, SubnetGroupRequest};
use anyhow::{Context, Result};
use aws_sdk_rds::types::DbSubnetGroup;
use tracing::{debug, info};

impl RdsClient {
    pub async fn describe_subnet_group(&self, name: &str) -> Result<Option<SubnetGroup>> {
        let result = self
            .client
            .describe_db_subnet_groups()
            .db_subnet_group_name(name)
            .send()
            .await;

        let Some(response) =
            ignore_not_found(result).context("Failed to describe DB subnet group")?
        else {
            debug!(subnet_group = %name, "DB subnet group not found");
            return Ok(None);
        };

        Ok(response.db_subnet_groups().first().and_then(subnet_group_from_sdk))
    }

    pub async fn create_subnet_group(&self, request: &SubnetGroupRequest) -> Result<SubnetGroup> {
        let response = self
            .client
            .create_db_subnet_group()
            .db_subnet_group_name(&request.name)
            .db_subnet_group_description(&request.description)
            .set_subnet_ids(Some(request.subnet_ids.clone()))
            .set_tags(Some(sdk_tags(&request.tags)))
            .send()
            .await
            .context("Failed to create DB subnet group")?;

        let group = response
            .db_subnet_group()
            .and_then(subnet_group_from_sdk)
            .context("Create response did not describe the subnet group")?;

        info!(subnet_group = %group.name, subnets = request.subnet_ids.len(), "DB subnet group created");
        Ok(group)
    }

    /// Delete a subnet group; deleting one that no longer exists succeeds
    pub async fn delete_subnet_group(&self, name: &str) -> Result<()> {
        let result = self
            .client
            .delete_db_subnet_group()
            .db_subnet_group_name(name)
            .send()
            .await;

        match ignore_not_found(result).context("Failed to delete DB subnet group")? {
            Some(_) => info!(subnet_group = %name, "DB subnet group deleted"),
            None => debug!(subnet_group = %name, "DB subnet group already deleted"),
        }
        Ok(())
    }
}

fn subnet_group_from_sdk(group: &DbSubnetGroup) -> Option<SubnetGroup> {
    Some(SubnetGroup {
        name: group.db_subnet_group_name()?.to_string(),
        arn: group.db_subnet_group_arn().unwrap_or_default().to_string(),
        status: group.subnet_group_status().unwrap_or_default().to_string(),
    })
}

//! Live RDS client backed by the AWS SDK

mod database;
mod snapshot;
mod subnet_group;

use crate::context::{AwsContext, FromAwsContext};
use anyhow::{Context, Result};
use aws_sdk_rds::Client;
use aws_sdk_rds::primitives::DateTime as SmithyDateTime;
use aws_sdk_rds::types::Tag;
use chrono::{DateTime, Utc};
use dbsnap_common::Tags;

/// RDS client bound to one region
pub struct RdsClient {
    pub(crate) client: Client,
    region: String,
}

impl FromAwsContext for RdsClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.rds_client(),
            region: ctx.region().to_string(),
        }
    }
}

impl RdsClient {
    /// Create a new RDS client (loads AWS config from environment)
    pub async fn new(region: &str, profile: Option<&str>) -> Self {
        let ctx = AwsContext::new(region, profile).await;
        Self::from_context(&ctx)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Tags currently attached to a resource
    pub async fn list_tags(&self, arn: &str) -> Result<Tags> {
        let response = self
            .client
            .list_tags_for_resource()
            .resource_name(arn)
            .send()
            .await
            .with_context(|| format!("Failed to list tags for {arn}"))?;

        Ok(response
            .tag_list()
            .iter()
            .filter_map(|t| Some((t.key()?.to_string(), t.value().unwrap_or_default().to_string())))
            .collect())
    }
}

impl std::fmt::Debug for RdsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdsClient")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Convert tag pairs into SDK tags
pub(crate) fn sdk_tags(tags: &[(String, String)]) -> Vec<Tag> {
    tags.iter()
        .map(|(k, v)| Tag::builder().key(k).value(v).build())
        .collect()
}

pub(crate) fn to_chrono(time: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

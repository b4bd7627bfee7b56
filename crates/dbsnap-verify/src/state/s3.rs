//! S3 store
//!
//! One object per database at `state-doc-<database>.json`. The ETag is
//! the version token: creates are conditional on the key being absent and
//! updates on the ETag still matching.

use crate::error::VerifyError;
use crate::state::document::StateDocument;
use crate::state::store::{StateStore, Versioned};
use anyhow::{Context, Result};
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use dbsnap_rds::{AwsContext, classify_aws_error, ignore_not_found};
use tracing::debug;

/// Object key holding the document for `database`
pub fn object_key(database: &str) -> String {
    format!("state-doc-{database}.json")
}

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    pub fn from_context(ctx: &AwsContext, bucket: &str) -> Self {
        Self::new(ctx.s3_client(), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl StateStore for S3Store {
    async fn load(&self, database: &str) -> Result<Option<Versioned>> {
        let key = object_key(database);
        let output = ignore_not_found(
            self.client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await,
        )
        .context("Failed to download state document")?;

        let Some(output) = output else {
            debug!(bucket = %self.bucket, key = %key, "No state document");
            return Ok(None);
        };

        let version = output
            .e_tag()
            .map(str::to_string)
            .context("State document has no ETag")?;
        let bytes = output
            .body
            .collect()
            .await
            .context("Failed to read state document body")?
            .into_bytes();

        Ok(Some(Versioned {
            document: StateDocument::from_json(&bytes)?,
            version,
        }))
    }

    async fn save(&self, document: &StateDocument, expected: Option<&str>) -> Result<String> {
        let key = object_key(&document.database);
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(document.to_json()?));
        let request = match expected {
            Some(etag) => request.if_match(etag),
            None => request.if_none_match("*"),
        };

        let output = match request.send().await {
            Ok(output) => output,
            Err(err) if classify_aws_error(err.code(), err.message()).is_precondition_failed() => {
                return Err(VerifyError::ConcurrentModification {
                    database: document.database.clone(),
                }
                .into());
            }
            Err(err) => return Err(err).context("Failed to upload state document"),
        };

        debug!(bucket = %self.bucket, key = %key, revision = document.revision, "Saved state document");
        output
            .e_tag()
            .map(str::to_string)
            .context("Upload returned no ETag")
    }
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

//! Persistence seam for state documents

use crate::state::document::StateDocument;
use crate::state::file::FileStore;
use crate::state::s3::S3Store;
use crate::state::types::PersistenceTarget;
use anyhow::Result;
use dbsnap_rds::AwsContext;

/// A loaded document together with the version token it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub document: StateDocument,
    pub version: String,
}

/// Load and save state documents with optimistic concurrency.
///
/// `save` takes the version the caller last saw: `None` means the
/// document must not exist yet, `Some` means it must still be at that
/// version. A mismatch fails with
/// [`VerifyError::ConcurrentModification`](crate::VerifyError::ConcurrentModification).
/// On success it returns the new version token.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
pub trait StateStore: Send + Sync {
    /// Document for `database`, or `None` if none was ever saved
    async fn load(&self, database: &str) -> Result<Option<Versioned>>;

    async fn save(&self, document: &StateDocument, expected: Option<&str>) -> Result<String>;
}

/// Store selected at runtime from a [`PersistenceTarget`]
#[derive(Debug)]
pub enum AnyStore {
    S3(S3Store),
    File(FileStore),
}

impl AnyStore {
    /// Open the store for `target`; S3 clients come from `aws`
    pub fn open(target: &PersistenceTarget, aws: &AwsContext) -> Self {
        match target {
            PersistenceTarget::Bucket(bucket) => Self::S3(S3Store::from_context(aws, bucket)),
            PersistenceTarget::Path(path) => Self::File(FileStore::new(path)),
        }
    }
}

impl StateStore for AnyStore {
    async fn load(&self, database: &str) -> Result<Option<Versioned>> {
        match self {
            Self::S3(store) => store.load(database).await,
            Self::File(store) => store.load(database).await,
        }
    }

    async fn save(&self, document: &StateDocument, expected: Option<&str>) -> Result<String> {
        match self {
            Self::S3(store) => store.save(document, expected).await,
            Self::File(store) => store.save(document, expected).await,
        }
    }
}

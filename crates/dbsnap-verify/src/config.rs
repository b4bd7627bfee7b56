//! Invocation configuration
//!
//! A scheduled trigger carries the full configuration for one database as
//! a JSON object. The same fields seed a new state document; once a
//! document exists its persisted values win.

use crate::error::ConfigError;
use crate::state::PersistenceTarget;
use dbsnap_rds::SnapshotType;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Instance class of the member created inside a restored cluster
pub const DEFAULT_CLUSTER_INSTANCE_CLASS: &str = "db.r5.large";

/// History entries kept when a cycle completes
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

pub(crate) fn default_cluster_instance_class() -> String {
    DEFAULT_CLUSTER_INSTANCE_CLASS.to_string()
}

pub(crate) fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// Verification settings for one database
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerifyConfig {
    /// Production database identifier
    #[serde(default)]
    pub database: String,
    /// Region holding the snapshots; the restore happens there too
    #[serde(default)]
    pub snapshot_region: String,
    #[serde(default, deserialize_with = "id_list")]
    pub database_subnet_ids: Vec<String>,
    #[serde(default, deserialize_with = "id_list")]
    pub database_security_group_ids: Vec<String>,
    #[serde(default)]
    pub state_doc_bucket: Option<String>,
    #[serde(default)]
    pub state_doc_path: Option<PathBuf>,
    /// `automated` or `manual`; absent considers every snapshot
    #[serde(default)]
    pub snapshot_type: Option<String>,
    #[serde(default = "default_cluster_instance_class")]
    pub cluster_instance_class: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl VerifyConfig {
    /// Check required fields and resolve the persistence target
    pub fn validate(&self) -> Result<PersistenceTarget, ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField("database"));
        }
        if self.snapshot_region.trim().is_empty() {
            return Err(ConfigError::MissingField("snapshot_region"));
        }
        self.snapshot_type()?;
        self.target()
    }

    pub fn target(&self) -> Result<PersistenceTarget, ConfigError> {
        PersistenceTarget::from_parts(
            self.state_doc_bucket.as_deref(),
            self.state_doc_path.as_deref(),
        )
    }

    pub fn snapshot_type(&self) -> Result<Option<SnapshotType>, ConfigError> {
        parse_snapshot_type(self.snapshot_type.as_deref())
    }
}

pub(crate) fn parse_snapshot_type(raw: Option<&str>) -> Result<Option<SnapshotType>, ConfigError> {
    raw.map(|t| {
        t.parse::<SnapshotType>()
            .map_err(|_| ConfigError::InvalidSnapshotType(t.to_string()))
    })
    .transpose()
}

/// Accept either a JSON list of ids or a comma separated string
pub(crate) fn id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ids {
        List(Vec<String>),
        Csv(String),
    }

    let ids = match Ids::deserialize(deserializer)? {
        Ids::List(ids) => ids,
        Ids::Csv(raw) => raw.split(',').map(str::to_string).collect(),
    };
    Ok(ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect())
}

//! The persisted state document
//!
//! One document per source database carries everything the verifier needs
//! between invocations. The history in `states` is append-only and never
//! empty; the last entry is the current state.

use crate::config::{
    VerifyConfig, default_cluster_instance_class, default_history_limit, id_list,
    parse_snapshot_type,
};
use crate::error::{ConfigError, VerifyError};
use crate::state::types::{PersistenceTarget, StateRecord, VerifyState};
use anyhow::{Context, Result, bail};
use dbsnap_common::epoch_seconds;
use dbsnap_common::naming::temp_identifier;
use dbsnap_rds::SnapshotType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub database: String,
    pub tmp_database: String,
    pub snapshot_region: String,
    #[serde(default, deserialize_with = "id_list")]
    pub database_subnet_ids: Vec<String>,
    #[serde(default, deserialize_with = "id_list")]
    pub database_security_group_ids: Vec<String>,
    /// Master password of the temporary database, only while it exists
    #[serde(default)]
    pub tmp_password: Option<String>,
    #[serde(default)]
    pub snapshot_verifying: Option<String>,
    #[serde(default)]
    pub snapshot_verified: Option<String>,
    #[serde(default)]
    pub snapshot_type: Option<String>,
    #[serde(default = "default_cluster_instance_class")]
    pub cluster_instance_class: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    states: Vec<StateRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_doc_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_doc_path: Option<PathBuf>,
    /// Incremented on every save
    #[serde(default)]
    pub revision: u64,
}

impl StateDocument {
    /// New document for `config`, seeded in `wait`.
    ///
    /// The seed entry is the only one added without a legality check.
    pub fn create(config: &VerifyConfig) -> Self {
        Self {
            database: config.database.clone(),
            tmp_database: temp_identifier(&config.database),
            snapshot_region: config.snapshot_region.clone(),
            database_subnet_ids: config.database_subnet_ids.clone(),
            database_security_group_ids: config.database_security_group_ids.clone(),
            tmp_password: None,
            snapshot_verifying: None,
            snapshot_verified: None,
            snapshot_type: config.snapshot_type.clone(),
            cluster_instance_class: config.cluster_instance_class.clone(),
            history_limit: config.history_limit,
            states: vec![StateRecord {
                state: VerifyState::Wait,
                timestamp: epoch_seconds(),
            }],
            state_doc_bucket: config.state_doc_bucket.clone(),
            state_doc_path: config.state_doc_path.clone(),
            revision: 0,
        }
    }

    /// Parse a stored document, rejecting one with an empty history
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let document: Self =
            serde_json::from_slice(bytes).context("Failed to parse state document")?;
        if document.states.is_empty() {
            bail!("State document for '{}' has no states", document.database);
        }
        Ok(document)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).context("Failed to serialize state document")
    }

    pub fn states(&self) -> &[StateRecord] {
        &self.states
    }

    pub fn current_state(&self) -> VerifyState {
        self.states
            .last()
            .map_or(VerifyState::Wait, |record| record.state)
    }

    pub fn previous_state(&self) -> Option<VerifyState> {
        self.states
            .len()
            .checked_sub(2)
            .map(|i| self.states[i].state)
    }

    /// Append `to` if the transition table allows it.
    ///
    /// Leaves the document untouched on failure. Does not persist; see
    /// [`StateSession::transition`](crate::state::StateSession::transition).
    pub fn transition(&mut self, to: VerifyState) -> Result<(), VerifyError> {
        let from = self.current_state();
        if !from.can_transition_to(to) {
            return Err(VerifyError::IllegalTransition { from, to });
        }
        self.states.push(StateRecord {
            state: to,
            timestamp: epoch_seconds(),
        });
        Ok(())
    }

    /// Drop the last transition. The seed entry is never removed.
    pub(crate) fn revert_transition(&mut self) {
        if self.states.len() > 1 {
            self.states.pop();
        }
    }

    /// Close out a finished cycle.
    ///
    /// Clears the temporary password, promotes `snapshot_verifying` to
    /// `snapshot_verified` and trims the history to `history_limit`.
    pub fn clean(&mut self) {
        self.tmp_password = None;
        if let Some(verified) = self.snapshot_verifying.take() {
            self.snapshot_verified = Some(verified);
        }
        let keep = self.history_limit.max(1);
        if self.states.len() > keep {
            self.states.drain(..self.states.len() - keep);
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn config() -> VerifyConfig {
        serde_json::from_value(json!({
            "database": "prod-test-db",
            "snapshot_region": "us-east-1",
            "database_subnet_ids": ["subnet-a"],
            "database_security_group_ids": ["sg-1"],
            "state_doc_bucket": "bucket",
            "history_limit": 3,
        }))
        .unwrap()
    }

    fn document_in(state: VerifyState) -> StateDocument {
        let mut doc = StateDocument::create(&config());
        doc.states[0].state = state;
        doc
    }

    #[test]
    fn test_create_seeds_wait() {
        let doc = StateDocument::create(&config());
        assert_eq!(doc.tmp_database, "dbsv-prod-test-db");
        assert_eq!(doc.states().len(), 1);
        assert_eq!(doc.current_state(), VerifyState::Wait);
        assert_eq!(doc.previous_state(), None);
        assert_eq!(doc.revision, 0);
    }

    #[test]
    fn test_transition_table_is_enforced() {
        for from in VerifyState::iter() {
            for to in VerifyState::iter() {
                let mut doc = document_in(from);
                let before = doc.states().to_vec();
                let result = doc.transition(to);

                if from.can_transition_to(to) {
                    assert!(result.is_ok(), "{from} -> {to}");
                    assert_eq!(doc.states().len(), before.len() + 1);
                    assert_eq!(doc.current_state(), to);
                    assert_eq!(doc.previous_state(), Some(from));
                } else {
                    assert!(
                        matches!(result, Err(VerifyError::IllegalTransition { .. })),
                        "{from} -> {to}"
                    );
                    assert_eq!(doc.states(), before.as_slice());
                }
            }
        }
    }

    #[test]
    fn test_revert_keeps_seed() {
        let mut doc = StateDocument::create(&config());
        doc.transition(VerifyState::Restore).unwrap();
        doc.revert_transition();
        doc.revert_transition();
        assert_eq!(doc.states().len(), 1);
        assert_eq!(doc.current_state(), VerifyState::Wait);
    }

    #[test]
    fn test_clean_promotes_snapshot_and_trims_history() {
        let mut doc = StateDocument::create(&config());
        for state in [
            VerifyState::Restore,
            VerifyState::Modify,
            VerifyState::Verify,
            VerifyState::Cleanup,
        ] {
            doc.transition(state).unwrap();
        }
        doc.tmp_password = Some("secret".to_string());
        doc.snapshot_verifying = Some("rds:prod-2024-01-02".to_string());

        doc.clean();

        assert_eq!(doc.tmp_password, None);
        assert_eq!(doc.snapshot_verifying, None);
        assert_eq!(doc.snapshot_verified.as_deref(), Some("rds:prod-2024-01-02"));
        assert_eq!(doc.states().len(), 3);
        assert_eq!(doc.current_state(), VerifyState::Cleanup);
    }

    #[test]
    fn test_json_round_trip() {
        let mut doc = StateDocument::create(&config());
        doc.transition(VerifyState::Restore).unwrap();
        doc.snapshot_verifying = Some("snap".to_string());

        let parsed = StateDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_reads_legacy_document() {
        let raw = json!({
            "database": "prod",
            "tmp_database": "dbsv-prod",
            "snapshot_region": "us-east-1",
            "database_subnet_ids": "subnet-a",
            "state_doc_path": "/tmp/prod.json",
            "snapshot_date": "2019-01-02",
            "states": [
                {"state": "wait", "timestamp": 1546300800},
                {"state": "restore", "timestamp": 1546300860.25}
            ]
        });
        let doc = StateDocument::from_json(raw.to_string().as_bytes()).unwrap();
        assert_eq!(doc.current_state(), VerifyState::Restore);
        assert_eq!(doc.database_subnet_ids, ["subnet-a"]);
        assert_eq!(doc.revision, 0);
        assert_eq!(doc.history_limit, 100);
        assert_eq!(
            doc.target().unwrap(),
            PersistenceTarget::Path("/tmp/prod.json".into())
        );
    }

    #[test]
    fn test_empty_history_is_rejected() {
        let raw = json!({
            "database": "prod",
            "tmp_database": "dbsv-prod",
            "snapshot_region": "us-east-1",
            "states": [],
        });
        assert!(StateDocument::from_json(raw.to_string().as_bytes()).is_err());
    }
}

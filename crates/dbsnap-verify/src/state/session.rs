//! A loaded document bound to its store
//!
//! Every transition is persisted before the caller can act on it. If the
//! save fails the in-memory append is rolled back so the session keeps
//! matching what is stored.

use crate::config::VerifyConfig;
use crate::state::document::StateDocument;
use crate::state::store::{StateStore, Versioned};
use crate::state::types::VerifyState;
use anyhow::Result;
use tracing::info;

pub struct StateSession<'a, S> {
    store: &'a S,
    document: StateDocument,
    version: String,
}

impl<'a, S: StateStore> StateSession<'a, S> {
    /// Load the document for `database`, if one exists
    pub async fn load(store: &'a S, database: &str) -> Result<Option<Self>> {
        Ok(store
            .load(database)
            .await?
            .map(|Versioned { document, version }| Self {
                store,
                document,
                version,
            }))
    }

    /// Load the document for `config.database`, creating it in `wait`
    /// when absent. Returns whether it was created.
    pub async fn get_or_create(store: &'a S, config: &VerifyConfig) -> Result<(Self, bool)> {
        if let Some(session) = Self::load(store, &config.database).await? {
            return Ok((session, false));
        }

        let document = StateDocument::create(config);
        let version = store.save(&document, None).await?;
        info!(
            database = %document.database,
            tmp_database = %document.tmp_database,
            "Created state document"
        );
        Ok((
            Self {
                store,
                document,
                version,
            },
            true,
        ))
    }

    pub fn document(&self) -> &StateDocument {
        &self.document
    }

    /// Mutable access for fields outside the history; call
    /// [`persist`](Self::persist) to save them
    pub fn document_mut(&mut self) -> &mut StateDocument {
        &mut self.document
    }

    pub fn current_state(&self) -> VerifyState {
        self.document.current_state()
    }

    /// Save the document as it is now
    pub async fn persist(&mut self) -> Result<()> {
        self.document.revision += 1;
        match self
            .store
            .save(&self.document, Some(&self.version))
            .await
        {
            Ok(version) => {
                self.version = version;
                Ok(())
            }
            Err(e) => {
                self.document.revision -= 1;
                Err(e)
            }
        }
    }

    /// Append `to` and persist it.
    ///
    /// An illegal transition fails without touching the document; a failed
    /// save rolls the append back.
    pub async fn transition(&mut self, to: VerifyState) -> Result<()> {
        let from = self.document.current_state();
        self.document.transition(to)?;
        if let Err(e) = self.persist().await {
            self.document.revert_transition();
            return Err(e);
        }
        info!(database = %self.document.database, from = %from, to = %to, "State transition");
        Ok(())
    }

    pub fn into_document(self) -> StateDocument {
        self.document
    }
}

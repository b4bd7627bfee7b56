//! In-memory store
//!
//! Used by tests. Versions are the document revision, the
//! same scheme as [`FileStore`](crate::state::FileStore). Clones share
//! their contents.

use crate::error::VerifyError;
use crate::state::document::StateDocument;
use crate::state::store::{StateStore, Versioned};
use anyhow::{Result, bail};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<String, StateDocument>,
    fail_saves: bool,
    saves: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a document in place without version checks
    pub fn insert(&self, document: StateDocument) {
        self.lock()
            .documents
            .insert(document.database.clone(), document);
    }

    pub fn get(&self, database: &str) -> Option<StateDocument> {
        self.lock().documents.get(database).cloned()
    }

    /// Make every save fail until reset
    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }
}

impl StateStore for MemoryStore {
    async fn load(&self, database: &str) -> Result<Option<Versioned>> {
        Ok(self.get(database).map(|document| Versioned {
            version: document.revision.to_string(),
            document,
        }))
    }

    async fn save(&self, document: &StateDocument, expected: Option<&str>) -> Result<String> {
        let mut inner = self.lock();
        if inner.fail_saves {
            bail!("injected save failure for '{}'", document.database);
        }

        let current = inner
            .documents
            .get(&document.database)
            .map(|d| d.revision.to_string());
        if current.as_deref() != expected {
            return Err(VerifyError::ConcurrentModification {
                database: document.database.clone(),
            }
            .into());
        }

        inner
            .documents
            .insert(document.database.clone(), document.clone());
        inner.saves += 1;
        Ok(document.revision.to_string())
    }
}

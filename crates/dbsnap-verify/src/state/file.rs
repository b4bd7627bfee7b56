//! Local file store
//!
//! The document is a pretty-printed JSON file. Writes go to a temporary
//! file in the same directory which is then renamed over the target, so a
//! reader never sees a partial document. The version token is the
//! document revision, re-read from disk before each write.

use crate::error::VerifyError;
use crate::state::document::StateDocument;
use crate::state::store::{StateStore, Versioned};
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<StateDocument>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => StateDocument::from_json(&bytes)
                .with_context(|| format!("Invalid state document at {}", self.path.display()))
                .map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read state document {}", self.path.display())),
        }
    }
}

impl StateStore for FileStore {
    async fn load(&self, database: &str) -> Result<Option<Versioned>> {
        let Some(document) = self.read().await? else {
            return Ok(None);
        };
        if document.database != database {
            bail!(
                "State document at {} belongs to '{}', not '{}'",
                self.path.display(),
                document.database,
                database
            );
        }
        Ok(Some(Versioned {
            version: document.revision.to_string(),
            document,
        }))
    }

    async fn save(&self, document: &StateDocument, expected: Option<&str>) -> Result<String> {
        let on_disk = self.read().await?.map(|d| d.revision.to_string());
        if on_disk.as_deref() != expected {
            return Err(VerifyError::ConcurrentModification {
                database: document.database.clone(),
            }
            .into());
        }

        let bytes = document.to_json()?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .context("State document write task failed")??;

        debug!(path = %self.path.display(), revision = document.revision, "Saved state document");
        Ok(document.revision.to_string())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(bytes)
        .context("Failed to write state document")?;
    file.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

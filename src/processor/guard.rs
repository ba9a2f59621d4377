//! Restore-on-empty decorator for tools that may truncate their input.

use crate::error::Result;
use crate::file_manager::{FileKind, FileManager};
use crate::processor::{applies_to, scratch_dir, Processor};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Snapshots the file before delegating and restores it if the inner processor
/// leaves it empty or missing.
pub struct RestoreOnEmpty {
    inner: Arc<dyn Processor>,
    scratch_root: PathBuf,
}

impl RestoreOnEmpty {
    pub fn new(inner: Arc<dyn Processor>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            scratch_root: scratch_root.into(),
        }
    }
}

#[async_trait]
impl Processor for RestoreOnEmpty {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> FileKind {
        self.inner.kind()
    }

    async fn process(&self, path: &Path) -> Result<()> {
        if !applies_to(self.inner.kind(), path).await {
            return Ok(());
        }

        let scratch = scratch_dir(&self.scratch_root, path)?;
        let snapshot = scratch.path().join("original");
        tokio::fs::copy(path, &snapshot).await?;

        let result = self.inner.process(path).await;

        if FileManager::file_size(path).await == 0 {
            warn!("{} emptied {}, restoring original", self.inner.name(), path.display());
            tokio::fs::copy(&snapshot, path).await?;
        }

        result
    }
}

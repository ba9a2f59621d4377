//! In-process processors used by the unit tests.

use crate::error::Result;
use crate::file_manager::FileKind;
use crate::processor::{applies_to, Processor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Records how many times it saw each file
pub struct Counting {
    name: String,
    kind: FileKind,
    pub calls: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl Counting {
    pub fn new(name: &str, kind: FileKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            calls: Arc::default(),
        }
    }

    pub fn calls_for(&self, path: &Path) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Processor for Counting {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FileKind {
        self.kind
    }

    async fn process(&self, path: &Path) -> Result<()> {
        // give other workers a chance to interleave
        tokio::task::yield_now().await;
        *self.calls.lock().unwrap().entry(path.to_path_buf()).or_insert(0) += 1;
        Ok(())
    }
}

/// Truncates files longer than `limit` bytes, once
pub struct ShrinkTo {
    kind: FileKind,
    limit: u64,
}

impl ShrinkTo {
    pub fn new(kind: FileKind, limit: u64) -> Self {
        Self { kind, limit }
    }
}

#[async_trait]
impl Processor for ShrinkTo {
    fn name(&self) -> &str {
        "shrink"
    }

    fn kind(&self) -> FileKind {
        self.kind
    }

    async fn process(&self, path: &Path) -> Result<()> {
        if !applies_to(self.kind, path).await {
            return Ok(());
        }
        let bytes = tokio::fs::read(path).await?;
        if bytes.len() as u64 > self.limit {
            tokio::fs::write(path, &bytes[..self.limit as usize]).await?;
        }
        Ok(())
    }
}

/// Truncates the file to zero bytes
pub struct Emptying {
    kind: FileKind,
}

impl Emptying {
    pub fn new(kind: FileKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Processor for Emptying {
    fn name(&self) -> &str {
        "emptying"
    }

    fn kind(&self) -> FileKind {
        self.kind
    }

    async fn process(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, b"").await?;
        Ok(())
    }
}

/// Panics on any file called `boom.*`, otherwise does nothing
pub struct Panicking;

#[async_trait]
impl Processor for Panicking {
    fn name(&self) -> &str {
        "panicking"
    }

    fn kind(&self) -> FileKind {
        FileKind::Png
    }

    async fn process(&self, path: &Path) -> Result<()> {
        if path.file_stem().map_or(false, |stem| stem == "boom") {
            panic!("processor exploded on {}", path.display());
        }
        Ok(())
    }
}

/// Always fails without touching the file
pub struct Failing;

#[async_trait]
impl Processor for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn kind(&self) -> FileKind {
        FileKind::Png
    }

    async fn process(&self, _path: &Path) -> Result<()> {
        Err(crate::error::OptimizeError::ToolLaunch {
            tool: "failing".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such tool"),
        })
    }
}

//! # File Worker Module
//!
//! Worker per l'ottimizzazione di un singolo file.
//! Separato dall'orchestratore per maggiore modularità.
//!
//! ## Responsabilità:
//! - Applica la catena di processor del tipo del file, nell'ordine configurato
//! - Un processor che fallisce viene loggato e la catena prosegue
//! - Riporta dimensione prima/dopo ed errori del file

use crate::file_manager::{FileKind, FileManager};
use crate::processor::ProcessorRegistry;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A file path plus its size at pipeline entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub path: PathBuf,
    pub original_size: u64,
}

impl WorkItem {
    pub async fn new(path: PathBuf) -> Self {
        let original_size = FileManager::file_size(&path).await;
        Self { path, original_size }
    }
}

/// Result of one file going through its chain once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub before: u64,
    pub after: u64,
    /// Processors that returned an error
    pub errors: usize,
}

impl FileOutcome {
    pub fn saved(&self) -> u64 {
        self.before.saturating_sub(self.after)
    }
}

/// Applies a processor chain to single files
pub struct FileWorker {
    registry: ProcessorRegistry,
    quiet: bool,
}

impl FileWorker {
    pub fn new(registry: ProcessorRegistry, quiet: bool) -> Self {
        Self { registry, quiet }
    }

    /// Run the full ordered chain for the file's kind
    pub async fn process_file(&self, item: &WorkItem) -> FileOutcome {
        let path = &item.path;
        let before = FileManager::file_size(path).await;
        let mut errors = 0;

        let chain = FileKind::from_path(path)
            .map(|kind| self.registry.chain_for(kind))
            .unwrap_or(&[]);

        for processor in chain {
            let size = FileManager::file_size(path).await;
            match processor.process(path).await {
                Ok(()) => {
                    let now = FileManager::file_size(path).await;
                    if now < size {
                        debug!("{}: {} -> {} bytes ({})", processor.name(), size, now, path.display());
                    }
                }
                Err(e) => {
                    errors += 1;
                    warn!("{} failed on {}: {}", processor.name(), path.display(), e);
                }
            }
        }

        let after = FileManager::file_size(path).await;
        if !self.quiet && after < before {
            self.report(path, before, after);
        }

        FileOutcome {
            path: path.clone(),
            before,
            after,
            errors,
        }
    }

    fn report(&self, path: &Path, before: u64, after: u64) {
        info!(
            "{}: File size decreased: {} -> {}",
            path.display(),
            FileManager::plural(before, "byte"),
            FileManager::plural(after, "byte")
        );
        info!(
            "{}: Savings of {} ({:.2}%)",
            path.display(),
            FileManager::plural(before - after, "byte"),
            FileManager::calculate_reduction(before, after)
        );
    }
}

//! # Processor Module
//!
//! Questo modulo definisce l'astrazione `Processor`: una trasformazione su un singolo file.
//!
//! ## Responsabilità:
//! - Trait `Processor` con dispatch dinamico (`Arc<dyn Processor>`)
//! - Contratto comune: il file viene sostituito solo da un candidato più piccolo
//! - Helper condivisi per scratch directory per file
//!
//! ## Strategie disponibili:
//! - `CommandProcessor`: invocazione di un tool esterno (template di argomenti immutabile)
//! - `RacingProcessor`: K varianti dello stesso tool in parallelo, vince la più piccola
//! - `RestoreOnEmpty`: decorator che ripristina il file se il tool lo svuota
//! - `Reencoder`: re-encode PNG in-process
//!
//! ## Sottomoduli:
//! - `template`: `ProcessorSpec`, il template di argomenti
//! - `command`: `CommandProcessor` e l'esecuzione dei tool
//! - `racing`: `RacingProcessor`
//! - `guard`: `RestoreOnEmpty`
//! - `reencode`: `Reencoder`
//! - `registry`: catene ordinate di processor per tipo di file

pub mod command;
pub mod guard;
pub mod racing;
pub mod reencode;
pub mod registry;
pub mod template;

pub use command::{CommandProcessor, InputStage};
pub use guard::RestoreOnEmpty;
pub use racing::RacingProcessor;
pub use reencode::Reencoder;
pub use registry::ProcessorRegistry;
pub use template::{ArgPosition, OutputMode, ProcessorSpec};

use crate::error::Result;
use crate::file_manager::{FileKind, FileManager};
use async_trait::async_trait;
use std::path::Path;
use tempfile::TempDir;

/// Names of every processor in the standard chains, usable with `--disable`
pub const KNOWN_PROCESSORS: &[&str] = &[
    "reencode",
    "oxipng",
    "oxipng-alpha",
    "zopflipng",
    "pngout",
    "ect",
    "pngfix",
    "zopfli",
    "optivorbis",
];

/// A unit of transformation for one file.
///
/// Implementations must leave the file untouched unless they produced a strictly
/// smaller, non-empty replacement. Returning `Err` is reserved for conditions that
/// prevented the attempt altogether.
#[async_trait]
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> FileKind;

    async fn process(&self, path: &Path) -> Result<()>;
}

/// True when `path` is an existing regular file whose extension matches `kind`
pub async fn applies_to(kind: FileKind, path: &Path) -> bool {
    if FileKind::from_path(path) != Some(kind) {
        return false;
    }
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Per-file scratch directory: hash of the file identity plus a random suffix
pub(crate) fn scratch_dir(root: &Path, file: &Path) -> Result<TempDir> {
    let prefix = format!("{}-", FileManager::scratch_key(file));
    Ok(tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_applies_to_checks_kind_and_existence() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("a.PNG");
        std::fs::write(&png, b"x").unwrap();

        assert!(applies_to(FileKind::Png, &png).await);
        assert!(!applies_to(FileKind::Ogg, &png).await);
        assert!(!applies_to(FileKind::Png, &dir.path().join("missing.png")).await);

        let folder = dir.path().join("folder.png");
        std::fs::create_dir(&folder).unwrap();
        assert!(!applies_to(FileKind::Png, &folder).await);
    }

    #[test]
    fn test_scratch_dirs_are_distinct() {
        let root = TempDir::new().unwrap();
        let file = Path::new("/assets/a.png");
        let a = scratch_dir(root.path(), file).unwrap();
        let b = scratch_dir(root.path(), file).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path()));
    }
}

//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file e la discovery degli asset.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva degli asset in directory (walkdir)
//! - Classificazione per tipo (`FileKind`) via estensione case-insensitive
//! - Commit atomico di un candidato ottimizzato (solo se strettamente più piccolo)
//! - Utilità per dimensioni, percentuali e formattazione human-readable
//! - Chiave di scratch per file (hash sha256 dell'identità del file)
//!
//! ## Tipi supportati:
//! - **png**: Immagini PNG
//! - **nbt**: Structured binary gzip-compresso
//! - **ogg**: Audio Vorbis
//! - **jar / zip**: Archivi (gestiti dall'archive optimizer)
//!
//! ## Sicurezza operazioni:
//! - Il candidato viene copiato in un temp file accanto all'originale
//! - Il temp file viene poi rinominato sopra l'originale (rename atomico)
//! - Un candidato vuoto, mancante o non più piccolo viene ignorato
//!
//! ## Esempio:
//! ```ignore
//! let files = FileManager::find_files(root, &[FileKind::Png, FileKind::Ogg]);
//! let committed = FileManager::commit_if_smaller(&file, &candidate).await?;
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Kind of asset, derived from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Png,
    Nbt,
    Ogg,
    Archive,
}

impl FileKind {
    /// Classify a path by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        Self::from_name(&ext)
    }

    /// Parse a kind name or extension (`"png"`, `"jar"`, `"archives"`...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "nbt" => Some(Self::Nbt),
            "ogg" => Some(Self::Ogg),
            "jar" | "zip" | "archive" | "archives" => Some(Self::Archive),
            _ => None,
        }
    }

    /// Canonical extension, used for temp/candidate file names
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Nbt => "nbt",
            Self::Ogg => "ogg",
            Self::Archive => "jar",
        }
    }

    pub fn all() -> [FileKind; 4] {
        [Self::Png, Self::Nbt, Self::Ogg, Self::Archive]
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find all files of the given kinds under `root`.
    ///
    /// A `root` that is itself a matching file yields just that file.
    /// Unreadable directory entries are skipped.
    pub fn find_files(root: &Path, kinds: &[FileKind]) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| matches!(FileKind::from_path(path), Some(kind) if kinds.contains(&kind)))
            .collect()
    }

    /// Current size of a file, 0 if it cannot be read
    pub async fn file_size(path: &Path) -> u64 {
        fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
    }

    /// Aggregate size of a set of files
    pub async fn total_size(files: &[PathBuf]) -> u64 {
        let mut sum = 0;
        for file in files {
            sum += Self::file_size(file).await;
        }
        sum
    }

    /// Replace `original` with `candidate` if the candidate exists, is non-empty
    /// and is strictly smaller. Returns whether the original was replaced.
    ///
    /// The candidate is first copied next to the original and then renamed over it,
    /// so the original is never observed truncated even if the candidate lives on
    /// another filesystem.
    pub async fn commit_if_smaller(original: &Path, candidate: &Path) -> Result<bool> {
        let candidate_size = match fs::metadata(candidate).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                debug!("No candidate produced for {}", original.display());
                return Ok(false);
            }
        };
        let original_size = fs::metadata(original).await?.len();

        if candidate_size == 0 || candidate_size >= original_size {
            debug!(
                "Discarding candidate for {} ({} >= {})",
                original.display(),
                candidate_size,
                original_size
            );
            return Ok(false);
        }

        let parent = original.parent().unwrap_or(Path::new(".")).to_path_buf();
        let original = original.to_path_buf();
        let candidate = candidate.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut staged = tempfile::NamedTempFile::new_in(&parent)?;
            let mut source = std::fs::File::open(&candidate)?;
            std::io::copy(&mut source, staged.as_file_mut())?;
            staged.as_file().sync_all()?;
            staged.persist(&original).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        Ok(true)
    }

    /// Stable key for per-file scratch directories (hash of the file identity)
    pub fn scratch_key(path: &Path) -> String {
        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        hex::encode(hasher.finalize())[..16].to_string()
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Format an integer with thousands separators (`1234567` -> `1,234,567`)
    pub fn format_count(value: u64) -> String {
        let digits = value.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }

    /// `plural(1, "byte")` -> `1 byte`, `plural(2048, "byte")` -> `2,048 bytes`
    pub fn plural(value: u64, unit: &str) -> String {
        let suffix = match (value, unit.ends_with('s')) {
            (1, _) => "",
            (_, true) => "es",
            _ => "s",
        };
        format!("{} {}{}", Self::format_count(value), unit, suffix)
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

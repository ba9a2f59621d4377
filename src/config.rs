//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri dell'ottimizzazione
//! - Fornisce validazione dei parametri prima di qualsiasi I/O
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `passes`: Numero massimo di passate (default: 3)
//! - `workers`: Numero di worker paralleli (default: 8)
//! - `png` / `nbt` / `ogg` / `archives`: Abilitazione per tipo di file (default: true)
//! - `reencode`: Re-encode PNG in-process alla prima passata (default: true)
//! - `force`: Esegue tutte le passate anche senza risparmio (default: false)
//! - `quiet`: Niente report per file né progress bar (default: false)
//! - `slow`: Elaborazione sequenziale sul task chiamante (default: false)
//! - `disabled`: Processor o tipi disabilitati per nome
//! - `work_dir`: Directory per i file di scratch (default: None = temp di sistema)
//! - `tool_timeout_secs`: Timeout per singola invocazione di tool (default: None)
//!
//! ## Validazione:
//! - `passes` e `workers` devono essere > 0
//! - Ogni nome in `disabled` deve essere un processor o un tipo noto
//! - `work_dir`, se presente, deve esistere ed essere una directory
//! - `tool_timeout_secs`, se presente, deve essere > 0
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     passes: 5,
//!     workers: 4,
//!     disabled: vec!["pngout".to_string()],
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::{OptimizeError, Result};
use crate::file_manager::FileKind;
use crate::processor::KNOWN_PROCESSORS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for an optimization run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of passes over the file set
    pub passes: usize,
    /// Number of parallel workers
    pub workers: usize,
    /// Optimize PNG images
    pub png: bool,
    /// Optimize gzip-compressed NBT files
    pub nbt: bool,
    /// Optimize OGG Vorbis audio
    pub ogg: bool,
    /// Recurse into jar/zip archives
    pub archives: bool,
    /// Re-encode PNGs in-process during the first pass
    pub reencode: bool,
    /// Keep running passes even when a pass saves nothing
    pub force: bool,
    /// Suppress per-file reports and the progress bar
    pub quiet: bool,
    /// Process files one at a time on the calling task
    pub slow: bool,
    /// Processor or kind names to skip
    pub disabled: Vec<String>,
    /// Scratch directory root (None = system temp dir)
    pub work_dir: Option<PathBuf>,
    /// Kill a tool invocation after this many seconds
    pub tool_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            passes: 3,
            workers: 8,
            png: true,
            nbt: true,
            ogg: true,
            archives: true,
            reencode: true,
            force: false,
            quiet: false,
            slow: false,
            disabled: Vec::new(),
            work_dir: None,
            tool_timeout_secs: None,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.passes == 0 {
            return Err(OptimizeError::Validation(
                "Number of passes must be greater than 0".to_string(),
            ));
        }

        if self.workers == 0 {
            return Err(OptimizeError::Validation(
                "Number of workers must be greater than 0".to_string(),
            ));
        }

        for name in &self.disabled {
            let known = KNOWN_PROCESSORS.contains(&name.as_str())
                || FileKind::from_name(name).is_some();
            if !known {
                return Err(OptimizeError::Validation(format!(
                    "Unknown processor or file kind: {} (known processors: {})",
                    name,
                    KNOWN_PROCESSORS.join(", ")
                )));
            }
        }

        if let Some(ref work_dir) = self.work_dir {
            if !work_dir.exists() {
                return Err(OptimizeError::Validation(format!(
                    "Work directory does not exist: {}",
                    work_dir.display()
                )));
            }
            if !work_dir.is_dir() {
                return Err(OptimizeError::Validation(format!(
                    "Work directory is not a directory: {}",
                    work_dir.display()
                )));
            }
        }

        if self.tool_timeout_secs == Some(0) {
            return Err(OptimizeError::Validation(
                "Tool timeout must be greater than 0 seconds".to_string(),
            ));
        }

        Ok(())
    }

    /// Root under which every scratch directory is created
    pub fn scratch_root(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }

    /// File kinds enabled by the toggles and not named in `disabled`
    pub fn enabled_kinds(&self) -> Vec<FileKind> {
        FileKind::all()
            .into_iter()
            .filter(|kind| match kind {
                FileKind::Png => self.png,
                FileKind::Nbt => self.nbt,
                FileKind::Ogg => self.ogg,
                FileKind::Archive => self.archives,
            })
            .filter(|kind| {
                !self
                    .disabled
                    .iter()
                    .any(|name| FileKind::from_name(name) == Some(*kind))
            })
            .collect()
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

//! # Racing Processor
//!
//! Esegue K varianti di parametri dello stesso tool in parallelo sullo stesso input.
//!
//! ## Responsabilità:
//! - Lancia tutte le varianti insieme, ognuna con il proprio file di output
//! - Attende tutte le varianti (nessuna cancellazione anticipata)
//! - Sceglie l'output non vuoto più piccolo e lo committa solo se più piccolo dell'originale
//! - Nessun output prodotto: errore loggato, `Ok(())` per non bloccare la catena
//!
//! ## Esempio:
//! ```ignore
//! let zopflipng = RacingProcessor::new("zopflipng", spec, scratch_root)
//!     .variants("0 1 2 3 4 m e p b".split(' ').map(|f| args![format!("--filters={}", f)]));
//! ```

use crate::error::Result;
use crate::file_manager::{FileKind, FileManager};
use crate::processor::command::run_variant;
use crate::processor::{applies_to, scratch_dir, Processor, ProcessorSpec};
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

/// Runs several parameter variants of one tool and keeps the smallest result
pub struct RacingProcessor {
    name: String,
    spec: ProcessorSpec,
    variants: Vec<Vec<String>>,
    scratch_root: PathBuf,
    timeout: Option<Duration>,
}

impl RacingProcessor {
    pub fn new(name: impl Into<String>, spec: ProcessorSpec, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            spec,
            variants: Vec::new(),
            scratch_root: scratch_root.into(),
            timeout: None,
        }
    }

    /// Variant flag sets; each one is appended after the fixed flags
    pub fn variants<I>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        self.variants = variants.into_iter().collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Processor for RacingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FileKind {
        self.spec.kind()
    }

    async fn process(&self, path: &Path) -> Result<()> {
        if !applies_to(self.spec.kind(), path).await {
            return Ok(());
        }
        let Some(binary) = self.spec.binary() else {
            debug!("{} unavailable, skipping {}", self.spec.tool(), path.display());
            return Ok(());
        };

        let scratch = scratch_dir(&self.scratch_root, path)?;
        let extension = self.spec.kind().extension();
        let outputs: Vec<PathBuf> = (0..self.variants.len())
            .map(|i| scratch.path().join(format!("variant-{}.{}", i, extension)))
            .collect();

        let runs = self.variants.iter().zip(&outputs).map(|(variant, output)| {
            run_variant(&self.spec, binary, path, output, variant, scratch.path(), self.timeout)
        });
        let results = join_all(runs).await;

        let mut first_error = None;
        let mut failures = 0;
        for result in results {
            if let Err(e) = result {
                debug!("{} variant failed on {}: {}", self.name, path.display(), e);
                failures += 1;
                first_error.get_or_insert(e);
            }
        }
        if failures == self.variants.len() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let mut best: Option<(u64, &PathBuf)> = None;
        for output in &outputs {
            let size = FileManager::file_size(output).await;
            if size > 0 && best.map_or(true, |(smallest, _)| size < smallest) {
                best = Some((size, output));
            }
        }

        let Some((size, winner)) = best else {
            error!("No output files found for {} ({})", path.display(), self.name);
            return Ok(());
        };

        if FileManager::commit_if_smaller(path, winner).await? {
            debug!("{} shrank {} to {} bytes", self.name, path.display(), size);
        }
        Ok(())
    }
}

//! # Command Processor
//!
//! Processor che invoca un tool esterno descritto da un `ProcessorSpec`.
//!
//! ## Responsabilità:
//! - Scratch directory isolata per ogni invocazione
//! - Stadio di input opzionale (gunzip per i file NBT)
//! - Esecuzione del tool con stdout/stderr scartati (o stdout come output)
//! - Exit code ignorato: conta solo il candidato prodotto
//! - Commit del candidato solo se non vuoto e strettamente più piccolo
//! - Timeout opzionale: il processo viene terminato e l'errore propagato

use crate::error::{OptimizeError, Result};
use crate::file_manager::{FileKind, FileManager};
use crate::processor::{applies_to, scratch_dir, OutputMode, Processor, ProcessorSpec};
use async_trait::async_trait;
use flate2::read::MultiGzDecoder;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// What the tool receives as input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStage {
    /// The file itself
    Direct,
    /// The gunzipped payload of the file, decompressed into scratch
    Gunzip,
}

/// Processor wrapping a single external-tool invocation
pub struct CommandProcessor {
    name: String,
    spec: ProcessorSpec,
    stage: InputStage,
    scratch_root: PathBuf,
    timeout: Option<Duration>,
}

impl CommandProcessor {
    pub fn new(name: impl Into<String>, spec: ProcessorSpec, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            spec,
            stage: InputStage::Direct,
            scratch_root: scratch_root.into(),
            timeout: None,
        }
    }

    /// Feed the tool the decompressed gzip payload instead of the file
    pub fn decompress_gzip(mut self) -> Self {
        self.stage = InputStage::Gunzip;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Processor for CommandProcessor {
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
        let input = match self.stage {
            InputStage::Direct => path.to_path_buf(),
            InputStage::Gunzip => {
                let payload = scratch.path().join("payload");
                gunzip(path, &payload).await?;
                payload
            }
        };

        let candidate = scratch
            .path()
            .join(format!("candidate.{}", self.spec.kind().extension()));
        run_variant(&self.spec, binary, &input, &candidate, &[], scratch.path(), self.timeout).await?;

        if FileManager::commit_if_smaller(path, &candidate).await? {
            debug!("{} shrank {}", self.name, path.display());
        }
        Ok(())
    }
}

/// Run one invocation of `spec`, leaving its result (if any) at `output`
pub(crate) async fn run_variant(
    spec: &ProcessorSpec,
    binary: &Path,
    input: &Path,
    output: &Path,
    variant: &[String],
    workdir: &Path,
    timeout: Option<Duration>,
) -> Result<()> {
    let target = if *spec.output_mode() == OutputMode::InPlace {
        tokio::fs::copy(input, output).await?;
        output
    } else {
        input
    };

    let args = spec.build_args(target, output, variant);
    let stdout = if *spec.output_mode() == OutputMode::Stdout {
        Stdio::from(std::fs::File::create(output)?)
    } else {
        Stdio::null()
    };

    let mut command = Command::new(binary);
    command
        .args(&args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(Stdio::null())
        .kill_on_drop(true);

    run_tool(spec.tool(), command, timeout).await
}

/// Spawn the tool and wait for it. The exit status is only logged.
async fn run_tool(tool: &str, mut command: Command, timeout: Option<Duration>) -> Result<()> {
    let start_time = std::time::Instant::now();
    let mut child = command.spawn().map_err(|source| OptimizeError::ToolLaunch {
        tool: tool.to_string(),
        source,
    })?;

    let status = match timeout {
        Some(limit) => {
            let waited = tokio::time::timeout(limit, child.wait()).await;
            match waited {
                Ok(status) => status?,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(OptimizeError::ToolTimeout {
                        tool: tool.to_string(),
                        seconds: limit.as_secs(),
                    });
                }
            }
        }
        None => child.wait().await?,
    };

    debug!("{} exited with {} after {:?}", tool, status, start_time.elapsed());
    Ok(())
}

/// Decompress a (possibly multi-member) gzip file into `dest`
async fn gunzip(source: &Path, dest: &Path) -> Result<()> {
    let source = source.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let decompress_err = |source_err: std::io::Error| OptimizeError::Decompress {
            path: source.clone(),
            source: source_err,
        };
        let input = std::fs::File::open(&source)?;
        let mut decoder = MultiGzDecoder::new(std::io::BufReader::new(input));
        let mut output = std::fs::File::create(&dest)?;
        std::io::copy(&mut decoder, &mut output).map_err(decompress_err)?;
        Ok(())
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
}

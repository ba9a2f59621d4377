//! # Pipeline Orchestrator
//!
//! Orchestratore multi-passata: applica le catene di processor a una lista di file
//! finché una passata non produce più risparmio o il budget di passate è esaurito.
//!
//! ## Responsabilità:
//! - Pool di worker di dimensione fissa su una coda condivisa (`Mutex<VecDeque>`)
//! - Barriera join-all tra una passata e la successiva
//! - Stop anticipato quando la passata non risparmia byte (salvo `force`)
//! - Rimozione dei processor solo-prima-passata dopo la passata 1
//! - Modalità lenta (`slow` o `workers == 1`): coda consumata sul task chiamante
//! - Un panic su un file viene loggato e contato come errore; la run prosegue
//!
//! ## Stati:
//! `Idle -> PassRunning(i) -> PassComplete(i) -> { PassRunning(i+1) | Done }`

use crate::config::Config;
use crate::file_manager::FileManager;
use crate::optimizer::progress_tracker::ProgressTracker;
use crate::optimizer::worker::{FileOutcome, FileWorker, WorkItem};
use crate::processor::ProcessorRegistry;
use crate::progress::RunStatistics;
use anyhow::Result;
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Sizes around one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub index: usize,
    pub before: u64,
    pub after: u64,
}

impl PassReport {
    pub fn savings(&self) -> u64 {
        self.before.saturating_sub(self.after)
    }
}

type WorkQueue = Arc<Mutex<VecDeque<WorkItem>>>;

/// Multi-pass orchestrator over a fixed list of files
pub struct Pipeline {
    config: Config,
    registry: ProcessorRegistry,
}

impl Pipeline {
    pub fn new(config: Config, registry: ProcessorRegistry) -> Self {
        Self { config, registry }
    }

    /// Run up to `config.passes` passes over `files`
    pub async fn run(&self, files: &[PathBuf]) -> Result<RunStatistics> {
        self.config.validate()?;
        let start_time = Instant::now();
        let mut stats = RunStatistics::new();
        let mut registry = self.registry.clone();

        let mut items = Vec::with_capacity(files.len());
        for file in files {
            items.push(WorkItem::new(file.clone()).await);
        }
        stats.bytes_before = items.iter().map(|item| item.original_size).sum();
        stats.bytes_after = stats.bytes_before;
        stats.files_processed = items.len();

        if items.is_empty() {
            info!("No files to optimize");
            return Ok(stats);
        }

        let passes = self.config.passes;
        let tracker = ProgressTracker::new(items.len(), self.config.quiet);

        for index in 1..=passes {
            let label = if passes == 1 {
                String::new()
            } else {
                format!("Pass {}/{}", index, passes)
            };
            if passes > 1 {
                info!("{} over {}", label, FileManager::plural(items.len() as u64, "file"));
            }
            tracker.start_pass(&label);

            let worker = Arc::new(FileWorker::new(registry.clone(), self.config.quiet));
            let before = FileManager::total_size(files).await;
            let outcomes = self.run_pass(items.clone(), worker, &tracker).await;
            let after = FileManager::total_size(files).await;
            let report = PassReport { index, before, after };

            stats.passes_run = index;
            for outcome in &outcomes {
                stats.record_file(outcome.before, outcome.after);
                stats.errors += outcome.errors;
            }
            debug!("Pass {}: {} -> {} bytes", report.index, report.before, report.after);

            if index == 1 {
                registry.remove_first_pass_only();
            }

            if report.savings() == 0 && !self.config.force {
                if index < passes {
                    info!("Pass {} saved nothing, stopping early", index);
                }
                break;
            }
        }

        stats.bytes_after = FileManager::total_size(files).await;
        stats.elapsed = start_time.elapsed();
        tracker.finish(&format!(
            "Done in {}",
            FileManager::plural(stats.passes_run as u64, "pass")
        ));

        Ok(stats)
    }

    /// One pass: drain the queue with the worker pool, then join all
    async fn run_pass(
        &self,
        items: Vec<WorkItem>,
        worker: Arc<FileWorker>,
        tracker: &ProgressTracker,
    ) -> Vec<FileOutcome> {
        let workers = self.config.workers.min(items.len()).max(1);
        let queue: WorkQueue = Arc::new(Mutex::new(items.into_iter().collect()));

        if self.config.slow || workers == 1 {
            return drain(queue, worker, tracker.clone()).await;
        }

        let handles: Vec<_> = (0..workers)
            .map(|_| tokio::spawn(drain(queue.clone(), worker.clone(), tracker.clone())))
            .collect();

        let mut outcomes = Vec::new();
        for (id, result) in futures::future::join_all(handles).await.into_iter().enumerate() {
            match result {
                Ok(done) => outcomes.extend(done),
                Err(e) if e.is_panic() => error!("Worker {} panicked: {}", id, e),
                Err(e) => error!("Worker {} was cancelled: {}", id, e),
            }
        }
        outcomes
    }
}

/// Pop files until the queue is empty. A panic while processing a file is
/// recorded as one error for that file.
async fn drain(queue: WorkQueue, worker: Arc<FileWorker>, tracker: ProgressTracker) -> Vec<FileOutcome> {
    let mut outcomes = Vec::new();
    loop {
        let next = queue.lock().await.pop_front();
        let Some(item) = next else {
            break;
        };
        let processed = AssertUnwindSafe(worker.process_file(&item)).catch_unwind().await;
        let outcome = match processed {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Processing {} panicked, leaving it as is", item.path.display());
                let size = FileManager::file_size(&item.path).await;
                FileOutcome {
                    path: item.path.clone(),
                    before: size,
                    after: size,
                    errors: 1,
                }
            }
        };
        tracker.handle_file_completion(&outcome);
        outcomes.push(outcome);
    }
    outcomes
}

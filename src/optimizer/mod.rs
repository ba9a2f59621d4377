//! # Optimizer Module
//!
//! Modulo che separa le responsabilità della pipeline in sottomoduli:
//! - `pipeline`: Orchestratore multi-passata e pool di worker
//! - `worker`: Applicazione della catena di processor a un singolo file
//! - `progress_tracker`: Collegamento tra risultati dei worker e progress bar

pub mod pipeline;
pub mod progress_tracker;
pub mod worker;

pub use pipeline::{PassReport, Pipeline};
pub use progress_tracker::ProgressTracker;
pub use worker::{FileOutcome, FileWorker, WorkItem};

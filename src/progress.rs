//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di una run.
//!
//! ## Responsabilità:
//! - Progress bar con `indicatif` per il feedback di ogni passata
//! - Progress bar nascosta in modalità `quiet`
//! - `RunStatistics`: byte prima/dopo, riduzione massima per file, passate eseguite
//! - Report finale con numeri separati da migliaia e pluralizzati
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [=========================>--------------] 42/64 (65%) Pass 2: logo.png
//! ```
//!
//! ## Esempio:
//! ```ignore
//! let progress = ProgressManager::new(files.len() as u64, config.quiet);
//! progress.start_pass("Pass 1/3");
//! progress.update("logo.png");
//! progress.finish(&stats.format_summary());
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Manages progress reporting for one pipeline run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager; a quiet manager draws nothing
    pub fn new(total_files: u64, quiet: bool) -> Self {
        let bar = ProgressBar::new(total_files);

        if quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
            return Self { bar };
        }

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {prefix} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Reset the bar for a new pass
    pub fn start_pass(&self, label: &str) {
        self.bar.reset();
        self.bar.set_prefix(label.to_string());
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics accumulated across all passes of a run
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStatistics {
    pub bytes_before: u64,
    pub bytes_after: u64,
    /// Largest single-file reduction, in percent
    pub max_reduction_percent: f64,
    /// Largest single-file reduction, in bytes
    pub max_reduction_bytes: u64,
    pub passes_run: usize,
    /// Distinct files handed to the run
    pub files_processed: usize,
    /// File-level failures (logged, file left unchanged)
    pub errors: usize,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one file's before/after sizes for a single pass
    pub fn record_file(&mut self, before: u64, after: u64) {
        if after >= before {
            return;
        }
        let saved = before - after;
        self.max_reduction_bytes = self.max_reduction_bytes.max(saved);
        let percent = FileManager::calculate_reduction(before, after);
        if percent > self.max_reduction_percent {
            self.max_reduction_percent = percent;
        }
    }

    pub fn bytes_saved(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.bytes_before, self.bytes_after)
    }

    /// Fold in the statistics of a nested run (e.g. an archive's contents)
    pub fn merge(&mut self, other: &RunStatistics) {
        self.bytes_before += other.bytes_before;
        self.bytes_after += other.bytes_after;
        self.max_reduction_bytes = self.max_reduction_bytes.max(other.max_reduction_bytes);
        if other.max_reduction_percent > self.max_reduction_percent {
            self.max_reduction_percent = other.max_reduction_percent;
        }
        self.passes_run = self.passes_run.max(other.passes_run);
        self.files_processed += other.files_processed;
        self.errors += other.errors;
    }

    pub fn format_summary(&self) -> String {
        let mut lines = vec![
            format!("Time taken: {:.2}s", self.elapsed.as_secs_f64()),
            format!(
                "Saved {} ({:.2}% of {}) in {}",
                FileManager::plural(self.bytes_saved(), "byte"),
                self.overall_reduction_percent(),
                FileManager::plural(self.bytes_before, "byte"),
                FileManager::plural(self.passes_run as u64, "pass"),
            ),
            format!(
                "Max reduction: {:.2}% / {}",
                self.max_reduction_percent,
                FileManager::plural(self.max_reduction_bytes, "byte")
            ),
        ];
        if self.errors > 0 {
            lines.push(format!("Errors: {}", FileManager::format_count(self.errors as u64)));
        }
        lines.join("\n")
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

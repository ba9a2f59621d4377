//! # Progress Tracking Module
//!
//! Collega i risultati dei worker alla progress bar.
//! La bar di `indicatif` è già thread-safe: il tracker non ha stato mutabile proprio.

use crate::file_manager::FileManager;
use crate::optimizer::worker::FileOutcome;
use crate::progress::ProgressManager;

/// Progress view of a pipeline run, shared by all workers
#[derive(Clone)]
pub struct ProgressTracker {
    pub total_files: usize,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(total_files: usize, quiet: bool) -> Self {
        Self {
            total_files,
            progress_manager: ProgressManager::new(total_files as u64, quiet),
        }
    }

    pub fn start_pass(&self, label: &str) {
        self.progress_manager.start_pass(label);
    }

    /// Advance the bar for a completed file
    pub fn handle_file_completion(&self, outcome: &FileOutcome) {
        let name = outcome
            .path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();

        let message = if outcome.errors > 0 {
            format!("[ERROR] {}: {} failed", name, outcome.errors)
        } else if outcome.after < outcome.before {
            format!(
                "[OK] {}: {:.1}% saved",
                name,
                FileManager::calculate_reduction(outcome.before, outcome.after)
            )
        } else {
            format!("[SKIP] {}: no gain", name)
        };
        self.progress_manager.update(&message);
    }

    pub fn files_done(&self) -> u64 {
        self.progress_manager.position()
    }

    pub fn finish(&self, summary: &str) {
        self.progress_manager.finish(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_completion_advances_bar() {
        let tracker = ProgressTracker::new(2, true);
        tracker.start_pass("Pass 1/2");
        tracker.handle_file_completion(&FileOutcome {
            path: PathBuf::from("a.png"),
            before: 10,
            after: 5,
            errors: 0,
        });
        tracker.handle_file_completion(&FileOutcome {
            path: PathBuf::from("b.png"),
            before: 10,
            after: 10,
            errors: 1,
        });
        assert_eq!(tracker.files_done(), 2);

        tracker.start_pass("Pass 2/2");
        assert_eq!(tracker.files_done(), 0);
    }
}

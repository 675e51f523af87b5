//! Per-batch outcome reporting.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use log::error;

/// An item the batch gave up on, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a batch: what went through, what was skipped, what was written.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Inputs processed without error, in processing order.
    pub succeeded: Vec<PathBuf>,
    /// Inputs skipped after an error.
    pub failed: Vec<FailedItem>,
    /// Final location of every file produced.
    pub outputs: Vec<PathBuf>,
    /// Folder the outputs were gathered in.
    pub destination: Option<PathBuf>,
}

impl BatchReport {
    /// Record a skipped input and log it with its file name.
    pub fn record_failure(&mut self, path: &Path, reason: impl Display) {
        let reason = reason.to_string();
        error!(">> Problem with {}: {}", path.display(), reason);
        self.failed.push(FailedItem {
            path: path.to_path_buf(),
            reason,
        });
    }

    pub fn record_success(&mut self, path: &Path) {
        self.succeeded.push(path.to_path_buf());
    }

    /// True when no input failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

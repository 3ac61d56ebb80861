mod extract;
mod package;
mod processor;
mod workdir;

pub use extract::{is_spreadsheet_entry, ExtractedArchive};
pub use processor::ArchiveProcessor;
pub use workdir::WorkDir;

use std::fmt;
use std::path::PathBuf;

/// Lifecycle of one batch archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Received,
    Extracting,
    PerEntryConversion,
    Repackaging,
    Done,
    Failed,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchState::Received => "received",
            BatchState::Extracting => "extracting",
            BatchState::PerEntryConversion => "converting",
            BatchState::Repackaging => "repackaging",
            BatchState::Done => "done",
            BatchState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Guards against archives that expand without bound.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveLimits {
    pub max_entries: usize,
    pub max_total_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 500,
            max_total_bytes: 256 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub name: String,
    pub reason: String,
}

/// Result of a batch with at least one converted entry.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub result_path: PathBuf,
    pub result_name: String,
    pub success_count: usize,
    pub failure_count: usize,
    pub processed_names: Vec<String>,
    pub failures: Vec<EntryFailure>,
}

impl BatchOutcome {
    pub fn failed_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn is_partial(&self) -> bool {
        self.failure_count > 0
    }
}

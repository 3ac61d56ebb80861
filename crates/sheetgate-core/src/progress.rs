use crate::archive::BatchState;

/// Trait for reporting archive batch progress.
///
/// CLI implements with indicatif, services can forward to their own channels.
/// All methods have default no-op implementations.
pub trait BatchReporter: Send + Sync {
    fn on_state(&self, _state: BatchState) {}
    fn on_extract_complete(&self, _entries: usize, _spreadsheets: usize) {}
    fn on_entry_converted(&self, _name: &str, _done: usize, _total: usize) {}
    fn on_entry_failed(&self, _name: &str, _reason: &str, _done: usize, _total: usize) {}
    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl BatchReporter for SilentReporter {}

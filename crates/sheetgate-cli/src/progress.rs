use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use sheetgate_core::archive::BatchState;
use sheetgate_core::BatchReporter;
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI batch reporter using indicatif.
///
/// - Extraction: spinner (entry count unknown until the archive is read)
/// - Conversion: progress bar over the spreadsheet entries
/// - Repackaging: spinner
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(&self, message: &'static str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl BatchReporter for CliReporter {
    fn on_state(&self, state: BatchState) {
        match state {
            BatchState::Extracting => self.spinner("Extracting archive..."),
            BatchState::Repackaging => self.spinner("Packaging results..."),
            BatchState::Failed => {
                self.finish_bar();
                eprintln!("  {} Batch failed", "✗".red());
            }
            BatchState::Received | BatchState::PerEntryConversion | BatchState::Done => {}
        }
    }

    fn on_extract_complete(&self, entries: usize, spreadsheets: usize) {
        self.finish_bar();
        eprintln!(
            "  {} Extracted {} entries, {} spreadsheets",
            "✓".green(),
            entries,
            spreadsheets
        );

        let pb = ProgressBar::new(spreadsheets as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Converting [{bar:30.cyan/dim}] {pos}/{len} ({msg})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_entry_converted(&self, name: &str, done: usize, _total: usize) {
        self.with_bar(|pb| {
            pb.set_message(name.to_string());
            pb.set_position(done as u64);
        });
    }

    fn on_entry_failed(&self, name: &str, reason: &str, done: usize, _total: usize) {
        self.with_bar(|pb| {
            pb.println(format!("  {} {}: {}", "✗".yellow(), name, reason));
            pb.set_position(done as u64);
        });
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Batch complete: {} converted, {} failed in {:.2}s",
            "✓".green(),
            succeeded,
            failed,
            duration_secs
        );
    }
}

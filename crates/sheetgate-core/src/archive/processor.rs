use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::extract::extract_archive;
use super::package::write_result_archive;
use super::workdir::WorkDir;
use super::{ArchiveLimits, BatchOutcome, BatchState, EntryFailure};
use crate::convert::SheetConverter;
use crate::error::Error;
use crate::paths;
use crate::progress::BatchReporter;
use crate::storage::naming;
use crate::storage::DerivedKind;
use crate::validator;

/// Unpacks a batch archive, converts each spreadsheet and zips the results.
pub struct ArchiveProcessor {
    converter: Arc<dyn SheetConverter>,
    limits: ArchiveLimits,
}

impl ArchiveProcessor {
    pub fn new(converter: Arc<dyn SheetConverter>) -> Self {
        Self {
            converter,
            limits: ArchiveLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ArchiveLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Runs the whole batch. The result archive is written to `output_dir`
    /// as the `-result.zip` derivative of `stored_name`.
    ///
    /// The working directory is removed on every exit path.
    pub fn process_zip_file(
        &self,
        zip_path: &Path,
        stored_name: &str,
        template_path: &Path,
        output_dir: &Path,
        reporter: &dyn BatchReporter,
    ) -> Result<BatchOutcome, Error> {
        let started = Instant::now();
        reporter.on_state(BatchState::Received);

        let result = self.run(zip_path, stored_name, template_path, output_dir, reporter);
        match &result {
            Ok(outcome) => {
                reporter.on_state(BatchState::Done);
                reporter.on_batch_complete(
                    outcome.success_count,
                    outcome.failure_count,
                    started.elapsed().as_secs_f64(),
                );
                info!(
                    archive = %stored_name,
                    result = %outcome.result_name,
                    succeeded = outcome.success_count,
                    failed = outcome.failure_count,
                    "batch complete"
                );
            }
            Err(e) => {
                reporter.on_state(BatchState::Failed);
                warn!(archive = %stored_name, "batch failed: {}", e);
            }
        }
        result
    }

    fn run(
        &self,
        zip_path: &Path,
        stored_name: &str,
        template_path: &Path,
        output_dir: &Path,
        reporter: &dyn BatchReporter,
    ) -> Result<BatchOutcome, Error> {
        let result_name = naming::derived_name(stored_name, DerivedKind::ResultArchive);
        let result_path = paths::resolve_in_root(output_dir, &result_name)?;

        let work = WorkDir::create_in(output_dir)?;
        let extract_root = work.path().join("entries");
        let converted_dir = work.path().join("converted");
        fs::create_dir(&extract_root)?;
        fs::create_dir(&converted_dir)?;

        reporter.on_state(BatchState::Extracting);
        let extracted = extract_archive(zip_path, &extract_root, &self.limits)?;
        let spreadsheets: Vec<&(String, PathBuf)> = extracted.spreadsheets().collect();
        reporter.on_extract_complete(extracted.files.len(), spreadsheets.len());
        debug!(
            "Extracted {} files ({} bytes), {} spreadsheets",
            extracted.files.len(),
            extracted.total_bytes,
            spreadsheets.len()
        );

        reporter.on_state(BatchState::PerEntryConversion);
        let total = spreadsheets.len();
        let mut processed_names = Vec::new();
        let mut outputs = Vec::new();
        let mut failures = Vec::new();
        for (done, (name, path)) in spreadsheets.into_iter().enumerate() {
            // One output dir per entry: `jan/week.xlsx` and `feb/week.xlsx`
            // both convert to `week.docx`.
            let entry_dir = converted_dir.join(done.to_string());
            let converted = fs::create_dir(&entry_dir)
                .map_err(|e| e.to_string())
                .and_then(|()| self.convert_entry(path, template_path, &entry_dir));
            match converted {
                Ok(output) => {
                    processed_names.push(name.clone());
                    outputs.push(output);
                    reporter.on_entry_converted(name, done + 1, total);
                }
                Err(reason) => {
                    warn!(entry = %name, "entry conversion failed: {}", reason);
                    reporter.on_entry_failed(name, &reason, done + 1, total);
                    failures.push(EntryFailure {
                        name: name.clone(),
                        reason,
                    });
                }
            }
        }

        if outputs.is_empty() {
            return Err(Error::BatchFailure(failures));
        }

        reporter.on_state(BatchState::Repackaging);
        let packaged = write_result_archive(&result_path, &outputs);
        discard_outputs(&outputs);
        packaged?;

        Ok(BatchOutcome {
            result_path,
            result_name,
            success_count: processed_names.len(),
            failure_count: failures.len(),
            processed_names,
            failures,
        })
    }

    /// Failures come back as a one-line summary.
    fn convert_entry(&self, path: &Path, template: &Path, output_dir: &Path) -> Result<PathBuf, String> {
        let file = File::open(path).map_err(|e| e.to_string())?;
        let name = path.to_string_lossy();
        validator::inspect(file, &name).map_err(|e| e.to_string())?;

        self.converter
            .convert(path, template, output_dir)
            .map_err(|e| format!("{:#}", e))
    }
}

/// Converter outputs may live outside the work dir; remove them explicitly.
fn discard_outputs(outputs: &[PathBuf]) {
    for output in outputs {
        if let Err(e) = fs::remove_file(output) {
            warn!("Error removing intermediate {}: {}", output.display(), e);
        }
    }
}

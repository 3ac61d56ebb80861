use chrono::{Local, NaiveDate};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

use super::template::{adjacent_periods, TemplatePattern};
use crate::convert::TemplateGenerator;

/// Counts from one sweep. Sweeps never fail; problems land in `failed`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub exempt: usize,
    pub retained: usize,
    pub failed: usize,
    pub bytes_freed: u64,
    pub templates_created: Vec<String>,
}

/// Reclaims files directly under the storage root.
pub struct RetentionSweeper {
    root: PathBuf,
    max_age: Duration,
    templates: TemplatePattern,
    generator: Arc<dyn TemplateGenerator>,
}

enum Mode {
    Aged(SystemTime),
    All,
}

impl RetentionSweeper {
    pub fn new(
        root: impl Into<PathBuf>,
        max_age: Duration,
        templates: TemplatePattern,
        generator: Arc<dyn TemplateGenerator>,
    ) -> Self {
        Self {
            root: root.into(),
            max_age,
            templates,
            generator,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn templates(&self) -> &TemplatePattern {
        &self.templates
    }

    /// Deletes files older than the retention window, then pre-warms the
    /// templates around today.
    pub fn sweep_aged(&self) -> SweepReport {
        self.sweep_aged_at(SystemTime::now(), Local::now().date_naive())
    }

    pub fn sweep_aged_at(&self, now: SystemTime, today: NaiveDate) -> SweepReport {
        let mut report = self.sweep(Mode::Aged(now));
        report.templates_created = self.prewarm_templates(today);
        info!(
            deleted = report.deleted,
            exempt = report.exempt,
            retained = report.retained,
            failed = report.failed,
            "retention sweep finished"
        );
        report
    }

    /// Deletes every regular file except templates. Used at boot, when no
    /// ownership survives the restart.
    pub fn sweep_all(&self) -> SweepReport {
        let report = self.sweep(Mode::All);
        info!(
            deleted = report.deleted,
            exempt = report.exempt,
            failed = report.failed,
            "full sweep finished"
        );
        report
    }

    /// Creates missing templates for the previous, current and next month.
    /// Anything already at a template's name is left alone.
    pub fn prewarm_templates(&self, today: NaiveDate) -> Vec<String> {
        let mut created = Vec::new();
        for (year, month) in adjacent_periods(today) {
            let name = self.templates.file_name(year, month);
            let dest = self.root.join(&name);
            // Symlinks count as present, dangling or not.
            if fs::symlink_metadata(&dest).is_ok() {
                debug!("Template {} already present", name);
                continue;
            }
            match self.generator.generate(year, month, &dest) {
                Ok(()) => {
                    info!("Generated template {}", name);
                    created.push(name);
                }
                Err(e) if created_elsewhere(&e) => {
                    debug!("Template {} appeared while generating", name);
                }
                Err(e) => {
                    warn!("Could not generate template {}: {:#}", name, e);
                    if fs::symlink_metadata(&dest).is_ok() {
                        if let Err(e) = fs::remove_file(&dest) {
                            error!("Error removing partial template {}: {}", dest.display(), e);
                        }
                    }
                }
            }
        }
        created
    }

    fn sweep(&self, mode: Mode) -> SweepReport {
        let mut report = SweepReport::default();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error reading storage root {}: {}", self.root.display(), e);
                report.failed += 1;
                return report;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error reading entry in {}: {}", self.root.display(), e);
                    report.failed += 1;
                    continue;
                }
            };
            let path = entry.path();

            // DirEntry metadata does not follow symlinks.
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!("Error getting metadata for {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };
            if !metadata.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().into_owned();
            if self.templates.matches(&file_name) {
                report.exempt += 1;
                continue;
            }

            if let Mode::Aged(now) = mode {
                let expired = metadata
                    .modified()
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .map(|age| age > self.max_age)
                    .unwrap_or(false);
                if !expired {
                    report.retained += 1;
                    continue;
                }
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Deleted {}", file_name);
                    report.deleted += 1;
                    report.bytes_freed += metadata.len();
                }
                Err(e) => {
                    warn!("Error deleting {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

/// Another sweeper or operator won the race to create the template.
fn created_elsewhere(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::AlreadyExists)
    })
}

use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

use super::ArchiveLimits;
use crate::error::{Error, ValidationError};
use crate::paths;
use crate::validator::{declared_extension, UploadKind};

/// Files written by a successful extraction.
#[derive(Debug, Default)]
pub struct ExtractedArchive {
    /// (entry name as stored in the archive, extracted path)
    pub files: Vec<(String, PathBuf)>,
    pub total_bytes: u64,
}

impl ExtractedArchive {
    /// Entries worth handing to the converter.
    pub fn spreadsheets(&self) -> impl Iterator<Item = &(String, PathBuf)> {
        self.files.iter().filter(|(name, _)| is_spreadsheet_entry(name))
    }
}

/// Spreadsheet by extension, skipping macOS resource forks.
pub fn is_spreadsheet_entry(entry_name: &str) -> bool {
    let unified = entry_name.replace('\\', "/");
    if unified.starts_with("__MACOSX/") || unified.contains("/__MACOSX/") {
        return false;
    }
    let base = unified.rsplit('/').next().unwrap_or(&unified);
    if base.starts_with("._") {
        return false;
    }
    declared_extension(base)
        .and_then(|ext| UploadKind::from_extension(&ext))
        .map(UploadKind::is_spreadsheet)
        .unwrap_or(false)
}

struct PlannedEntry {
    index: usize,
    name: String,
    dest: PathBuf,
    is_dir: bool,
}

/// Extracts every entry of the archive at `zip_path` beneath `dest_root`.
///
/// All entry names are checked before the first byte is written; one unsafe
/// name fails the whole archive.
pub fn extract_archive(
    zip_path: &Path,
    dest_root: &Path,
    limits: &ArchiveLimits,
) -> Result<ExtractedArchive, Error> {
    let mut archive = ZipArchive::new(File::open(zip_path)?)?;

    if archive.len() > limits.max_entries {
        return Err(ValidationError::TooManyEntries {
            count: archive.len(),
            max: limits.max_entries,
        }
        .into());
    }

    let plan = plan_entries(&mut archive, dest_root, limits)?;
    debug!("{} entries passed path checks", plan.len());

    let mut extracted = ExtractedArchive::default();
    for entry in plan {
        if entry.is_dir {
            fs::create_dir_all(&entry.dest)?;
            continue;
        }
        if let Some(parent) = entry.dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let remaining = limits.max_total_bytes - extracted.total_bytes;
        let mut zipped = archive.by_index(entry.index)?;
        let mut out = File::create(&entry.dest)?;
        // One byte past the budget is enough to detect an overrun.
        let written = io::copy(&mut (&mut zipped).take(remaining + 1), &mut out)?;
        if written > remaining {
            warn!(entry = %entry.name, "archive exceeded the expansion limit");
            return Err(ValidationError::ArchiveTooLarge {
                max: limits.max_total_bytes,
            }
            .into());
        }
        extracted.total_bytes += written;
        extracted.files.push((entry.name, entry.dest));
    }

    Ok(extracted)
}

fn plan_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    dest_root: &Path,
    limits: &ArchiveLimits,
) -> Result<Vec<PlannedEntry>, Error> {
    let mut plan = Vec::with_capacity(archive.len());
    let mut declared_total: u64 = 0;

    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        let dest = match paths::resolve_entry(dest_root, &name) {
            Ok(dest) => dest,
            Err(e) => {
                warn!(entry = %name, "archive entry escapes the extraction root");
                return Err(e);
            }
        };

        declared_total = declared_total.saturating_add(entry.size());
        if declared_total > limits.max_total_bytes {
            return Err(ValidationError::ArchiveTooLarge {
                max: limits.max_total_bytes,
            }
            .into());
        }

        plan.push(PlannedEntry {
            index,
            name,
            dest,
            is_dir: entry.is_dir(),
        });
    }

    Ok(plan)
}

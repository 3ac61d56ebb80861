use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Error;

/// Zips `outputs` flat into `dest`. Each member is named after its file name;
/// repeats get `-2`, `-3`, ... before the extension. A failed write removes
/// the partial archive.
pub fn write_result_archive(dest: &Path, outputs: &[PathBuf]) -> Result<Vec<String>, Error> {
    match write_members(dest, outputs) {
        Ok(names) => Ok(names),
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(dest) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    error!("Failed to remove partial archive {}: {}", dest.display(), cleanup);
                }
            }
            Err(e)
        }
    }
}

fn write_members(dest: &Path, outputs: &[PathBuf]) -> Result<Vec<String>, Error> {
    let mut writer = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut used = HashSet::new();
    let mut members = Vec::with_capacity(outputs.len());
    for output in outputs {
        let member = unique_member_name(output, &mut used);
        writer.start_file(member.as_str(), options)?;
        io::copy(&mut File::open(output)?, &mut writer)?;
        members.push(member);
    }

    writer.finish()?;
    Ok(members)
}

fn unique_member_name(output: &Path, used: &mut HashSet<String>) -> String {
    let file_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    if used.insert(file_name.clone()) {
        return file_name;
    }

    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = output
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}{}", stem, n, extension);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

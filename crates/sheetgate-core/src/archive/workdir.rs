use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::hasher;

/// Scratch directory for one batch. Removed, children first, when dropped.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Creates `.batch-{token}` inside `parent`.
    pub fn create_in(parent: &Path) -> io::Result<Self> {
        let path = parent.join(format!(".batch-{}", hasher::new_token()));
        fs::create_dir(&path)?;
        debug!("Created work dir {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        let removed = remove_tree(&self.path);
        debug!("Removed work dir {} ({} entries)", self.path.display(), removed);
    }
}

/// Deletes a directory tree bottom-up without following symlinks.
/// Failures are logged and skipped. Returns the number of entries removed.
pub(crate) fn remove_tree(root: &Path) -> usize {
    let mut removed = 0;
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error walking {}: {}", root.display(), e);
                continue;
            }
        };
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => warn!("Error removing {}: {}", entry.path().display(), e),
        }
    }
    removed
}

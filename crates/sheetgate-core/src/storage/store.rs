use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::models::{DerivedKind, StoredFile, StoredResource};
use super::naming;
use crate::error::{Error, ValidationError};
use crate::hasher;
use crate::paths;
use crate::registry::OwnershipRegistry;
use crate::validator;

/// Flat directory of uploads and their derived artifacts.
pub struct FileStore {
    root: PathBuf,
    registry: Arc<OwnershipRegistry>,
}

impl FileStore {
    /// Creates `root` if needed and pins it to its canonical form.
    pub fn open(root: impl AsRef<Path>, registry: Arc<OwnershipRegistry>) -> Result<Self, Error> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let root = fs::canonicalize(root)?;
        info!("File store rooted at {}", root.display());
        Ok(Self { root, registry })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &Arc<OwnershipRegistry> {
        &self.registry
    }

    /// Validates, names, writes and registers an upload.
    pub fn store(&self, data: &[u8], declared_name: &str, session_id: &str) -> Result<StoredFile, Error> {
        if session_id.is_empty() {
            return Err(ValidationError::MissingSession.into());
        }
        let kind = validator::validate_bytes(data, declared_name)?;

        let digest = hasher::hash_bytes(data);
        let name = naming::compose_name(
            &naming::session_prefix(session_id),
            &hasher::new_token(),
            &digest.short(),
            kind.extension(),
        );
        let path = paths::resolve_in_root(&self.root, &name)?;

        write_new(&path, data)?;
        self.registry.track(session_id, &name);

        info!(
            file = %name,
            size = data.len(),
            hash = %digest.short(),
            "stored upload"
        );
        Ok(StoredFile {
            name,
            path,
            session_id: session_id.to_string(),
            created_at: Utc::now(),
            size: data.len() as u64,
            content_hash: digest.to_hex(),
        })
    }

    /// Path a stored name resolves to. Does not check existence.
    pub fn load(&self, name: &str) -> Result<PathBuf, Error> {
        paths::resolve_in_root(&self.root, name)
    }

    pub fn load_as_resource(&self, name: &str) -> Result<StoredResource, Error> {
        let path = self.load(name)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(Error::NotFound(name.to_string()));
        }
        Ok(StoredResource {
            name: name.to_string(),
            path,
            size: metadata.len(),
            file,
        })
    }

    /// Ownership check first; a mismatch is a hard deny.
    pub fn open_for_session(&self, session_id: &str, name: &str) -> Result<StoredResource, Error> {
        if !self.verify_ownership(session_id, name) {
            warn!(file = %name, "denied read by non-owning session");
            return Err(Error::Ownership(name.to_string()));
        }
        self.load_as_resource(name)
    }

    pub fn verify_ownership(&self, session_id: &str, name: &str) -> bool {
        !session_id.is_empty() && self.registry.verify(session_id, name)
    }

    pub fn derived_name(&self, base: &str, kind: DerivedKind) -> String {
        naming::derived_name(base, kind)
    }

    /// Registers an artifact generated from `base` under `session_id`.
    pub fn track_generated_file(&self, base: &str, derived: &str, session_id: &str) -> Result<(), Error> {
        if session_id.is_empty() {
            return Err(ValidationError::MissingSession.into());
        }
        paths::resolve_in_root(&self.root, derived)?;
        if !derived.starts_with(naming::stem(base)) {
            warn!(base = %base, derived = %derived, "generated file does not extend its base name");
        }
        self.registry.track(session_id, derived);
        debug!(base = %base, derived = %derived, "tracked generated file");
        Ok(())
    }

    /// Moves an externally produced artifact into the root under the derived
    /// name of `base` and registers it.
    pub fn adopt_derived(
        &self,
        produced: &Path,
        base: &str,
        kind: DerivedKind,
        session_id: &str,
    ) -> Result<StoredFile, Error> {
        let name = naming::derived_name(base, kind);
        let path = paths::resolve_in_root(&self.root, &name)?;

        if fs::rename(produced, &path).is_err() {
            // Cross-device outputs need a copy.
            fs::copy(produced, &path)?;
            if let Err(e) = fs::remove_file(produced) {
                warn!("Could not remove converter output {}: {}", produced.display(), e);
            }
        }
        let size = fs::metadata(&path)?.len();
        let content_hash = hasher::hash_reader(File::open(&path)?)?.to_hex();
        self.track_generated_file(base, &name, session_id)?;

        Ok(StoredFile {
            name,
            path,
            session_id: session_id.to_string(),
            created_at: Utc::now(),
            size,
            content_hash,
        })
    }
}

/// Exclusive create; a failed write leaves nothing behind.
fn write_new(path: &Path, data: &[u8]) -> Result<(), Error> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = file.write_all(data).and_then(|_| file.sync_all()) {
        drop(file);
        if let Err(cleanup) = fs::remove_file(path) {
            error!("Failed to remove partial write {}: {}", path.display(), cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}

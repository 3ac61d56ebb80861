use chrono::{DateTime, Utc};
use std::fs::File;
use std::path::PathBuf;

/// An upload persisted under the storage root.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub size: u64,
    /// Full SHA-256 hex of the original bytes; the name carries its first 16 chars.
    pub content_hash: String,
}

/// An opened stored file, ready to stream back to its owner.
#[derive(Debug)]
pub struct StoredResource {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub file: File,
}

/// Artifacts produced from an upload. Their names extend the upload's stem so
/// every output traces back to the original bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKind {
    Document,
    Pdf,
    ResultArchive,
}

impl DerivedKind {
    pub fn suffix(self) -> &'static str {
        match self {
            DerivedKind::Document => ".docx",
            DerivedKind::Pdf => ".pdf",
            DerivedKind::ResultArchive => "-result.zip",
        }
    }
}

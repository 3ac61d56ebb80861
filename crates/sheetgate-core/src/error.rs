use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::archive::EntryFailure;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Upload rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("'{name}' resolves outside {}", root.display())]
    Traversal { name: String, root: PathBuf },

    #[error("Session is not the owner of '{0}'")]
    Ownership(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("No conversion slot became free within {0:?}")]
    AdmissionTimeout(Duration),

    #[error("No archive entries could be converted ({} failed)", .0.len())]
    BatchFailure(Vec<EntryFailure>),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{0}")]
    Other(String),
}

/// Reasons an upload is refused before anything touches the disk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file is empty")]
    Empty,

    #[error("file is {len} bytes, below the minimum of {min}")]
    TooSmall { len: usize, min: usize },

    #[error("file name has no extension")]
    MissingExtension,

    #[error("extension '.{0}' is not accepted")]
    UnsupportedExtension(String),

    #[error("content does not carry the {expected} signature required for '.{extension}'")]
    SignatureMismatch {
        extension: String,
        expected: &'static str,
    },

    #[error("content carries a {0} executable signature")]
    ExecutableSignature(&'static str),

    #[error("session id is empty")]
    MissingSession,

    #[error("archive holds {count} entries, more than the limit of {max}")]
    TooManyEntries { count: usize, max: usize },

    #[error("archive expands beyond {max} bytes")]
    ArchiveTooLarge { max: u64 },
}

/// Closed set of outcomes the transport layer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Traversal,
    Ownership,
    NotFound,
    AdmissionTimeout,
    BatchFailure,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::Traversal => 400,
            ErrorKind::Ownership => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::BatchFailure => 422,
            ErrorKind::AdmissionTimeout => 429,
            ErrorKind::Internal => 500,
        }
    }

    /// Message safe to show a client. Never includes paths or session ids.
    pub fn public_message(self) -> &'static str {
        match self {
            ErrorKind::Validation => "The uploaded file was rejected.",
            ErrorKind::Traversal => "The requested name is not allowed.",
            ErrorKind::Ownership => "Access denied.",
            ErrorKind::NotFound => "File not found.",
            ErrorKind::AdmissionTimeout => "The server is busy. Please retry shortly.",
            ErrorKind::BatchFailure => "None of the files in the archive could be converted.",
            ErrorKind::Internal => "An internal error occurred.",
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::AdmissionTimeout)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Traversal { .. } => ErrorKind::Traversal,
            Error::Ownership(_) => ErrorKind::Ownership,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::AdmissionTimeout(_) => ErrorKind::AdmissionTimeout,
            Error::BatchFailure(_) => ErrorKind::BatchFailure,
            Error::Archive(_)
            | Error::Conversion(_)
            | Error::Io(_)
            | Error::Config(_)
            | Error::Other(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_to_distinct_statuses() {
        let kinds = [
            ErrorKind::Ownership,
            ErrorKind::NotFound,
            ErrorKind::AdmissionTimeout,
            ErrorKind::BatchFailure,
            ErrorKind::Internal,
        ];
        let mut statuses: Vec<u16> = kinds.iter().map(|k| k.status()).collect();
        statuses.sort_unstable();
        statuses.dedup();
        assert_eq!(statuses.len(), kinds.len());
    }

    #[test]
    fn test_only_admission_timeout_is_retryable() {
        let err = Error::AdmissionTimeout(Duration::from_secs(1));
        assert!(err.kind().is_retryable());
        assert_eq!(err.kind().status(), 429);

        let err = Error::from(ValidationError::Empty);
        assert!(!err.kind().is_retryable());
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_public_message_hides_details() {
        let err = Error::Ownership("abc_secret.xlsx".to_string());
        assert!(!err.kind().public_message().contains("abc_secret"));
    }
}

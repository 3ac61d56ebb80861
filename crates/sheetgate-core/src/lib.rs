pub mod admission;
pub mod archive;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod paths;
pub mod progress;
pub mod registry;
pub mod retention;
pub mod storage;
pub mod validator;

pub use admission::{AdmissionController, AdmissionPermit, AdmissionStats};
pub use archive::{ArchiveProcessor, BatchOutcome, EntryFailure};
pub use config::AppConfig;
pub use engine::IntakeEngine;
pub use error::{Error, ErrorKind, ValidationError};
pub use progress::{BatchReporter, SilentReporter};
pub use registry::OwnershipRegistry;
pub use retention::{RetentionSweeper, SweepReport, SweepScheduler};
pub use storage::{DerivedKind, FileStore, StoredFile, StoredResource};

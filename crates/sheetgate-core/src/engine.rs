use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::admission::{AdmissionController, AdmissionPermit, AdmissionStats};
use crate::archive::{ArchiveLimits, ArchiveProcessor, BatchOutcome, WorkDir};
use crate::config::AppConfig;
use crate::convert::{
    CommandConverter, CopyTemplateGenerator, NoTemplates, OfficePdfRenderer, PdfRenderer,
    SheetConverter, TemplateGenerator, UnconfiguredConverter,
};
use crate::error::{Error, ValidationError};
use crate::progress::BatchReporter;
use crate::registry::OwnershipRegistry;
use crate::retention::{RetentionSweeper, SweepReport, SweepScheduler, TemplatePattern};
use crate::storage::{DerivedKind, FileStore, StoredFile, StoredResource};
use crate::validator::{declared_extension, UploadKind};

/// External tooling the engine delegates to.
pub struct Collaborators {
    pub converter: Arc<dyn SheetConverter>,
    pub renderer: Arc<dyn PdfRenderer>,
    pub templates: Arc<dyn TemplateGenerator>,
}

impl Collaborators {
    pub fn from_config(config: &AppConfig) -> Self {
        let converter: Arc<dyn SheetConverter> = match &config.converter_command {
            Some(cmd) => Arc::new(CommandConverter::new(cmd.clone())),
            None => Arc::new(UnconfiguredConverter),
        };
        let templates: Arc<dyn TemplateGenerator> = match &config.template_source {
            Some(source) => Arc::new(CopyTemplateGenerator::new(source)),
            None => Arc::new(NoTemplates),
        };
        Self {
            converter,
            renderer: Arc::new(OfficePdfRenderer::new(config.office_command.clone())),
            templates,
        }
    }
}

/// Request-facing entry point: admission, storage, ownership, batch
/// processing and retention wired together.
pub struct IntakeEngine {
    config: AppConfig,
    store: FileStore,
    admission: AdmissionController,
    processor: ArchiveProcessor,
    converter: Arc<dyn SheetConverter>,
    renderer: Arc<dyn PdfRenderer>,
    sweeper: Arc<RetentionSweeper>,
}

impl IntakeEngine {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Result<Self, Error> {
        let registry = Arc::new(OwnershipRegistry::new());
        let store = FileStore::open(config.storage_root(), registry)?;
        let admission =
            AdmissionController::new(config.max_concurrent_conversions, config.permit_timeout());
        let processor = ArchiveProcessor::new(Arc::clone(&collaborators.converter)).with_limits(
            ArchiveLimits {
                max_entries: config.max_archive_entries,
                max_total_bytes: config.max_archive_bytes,
            },
        );
        let sweeper = Arc::new(RetentionSweeper::new(
            store.root(),
            config.retention(),
            TemplatePattern::new(&config.template_prefix)?,
            collaborators.templates,
        ));

        Ok(Self {
            config,
            store,
            admission,
            processor,
            converter: collaborators.converter,
            renderer: collaborators.renderer,
            sweeper,
        })
    }

    /// Boot sequence: full sweep (ownership did not survive the restart),
    /// template pre-warm, then the periodic sweeper.
    pub fn start(&self) -> Result<SweepScheduler, Error> {
        let report = self.sweeper.sweep_all();
        info!("Startup sweep removed {} files", report.deleted);
        self.sweeper.prewarm_templates(Local::now().date_naive());
        let scheduler =
            SweepScheduler::spawn(Arc::clone(&self.sweeper), self.config.sweep_interval())?;
        Ok(scheduler)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn sweeper(&self) -> &Arc<RetentionSweeper> {
        &self.sweeper
    }

    pub fn acquire_permit(&self) -> Result<AdmissionPermit, Error> {
        self.admission.acquire()
    }

    pub fn admission_stats(&self) -> AdmissionStats {
        self.admission.stats()
    }

    /// Persists an upload under a permit.
    pub fn store_upload(&self, data: &[u8], declared_name: &str, session_id: &str) -> Result<StoredFile, Error> {
        let _permit = self.admission.acquire()?;
        self.store.store(data, declared_name, session_id)
    }

    pub fn load_for_session(&self, session_id: &str, name: &str) -> Result<StoredResource, Error> {
        self.store.open_for_session(session_id, name)
    }

    pub fn verify_ownership(&self, session_id: &str, name: &str) -> bool {
        self.store.verify_ownership(session_id, name)
    }

    pub fn track_generated_file(&self, base: &str, derived: &str, session_id: &str) -> Result<(), Error> {
        self.store.track_generated_file(base, derived, session_id)
    }

    pub fn files_for(&self, session_id: &str) -> Vec<String> {
        self.store.registry().files_for(session_id)
    }

    pub fn forget_session(&self, session_id: &str) -> usize {
        self.store.registry().forget(session_id)
    }

    /// Converts an owned spreadsheet into its `.docx` derivative.
    pub fn generate_document(&self, session_id: &str, name: &str, template: &Path) -> Result<StoredFile, Error> {
        let input = self.owned_path(session_id, name)?;
        let _permit = self.admission.acquire()?;

        let work = WorkDir::create_in(self.store.root())?;
        let produced = self
            .converter
            .convert(&input, template, work.path())
            .map_err(|e| Error::Conversion(format!("{:#}", e)))?;
        self.store
            .adopt_derived(&produced, name, DerivedKind::Document, session_id)
    }

    /// Renders an owned document to its `.pdf` derivative.
    pub fn render_pdf(&self, session_id: &str, name: &str) -> Result<StoredFile, Error> {
        let input = self.owned_path(session_id, name)?;
        let _permit = self.admission.acquire()?;

        let work = WorkDir::create_in(self.store.root())?;
        let produced = self
            .renderer
            .render(&input, work.path())
            .map_err(|e| Error::Conversion(format!("{:#}", e)))?;
        self.store
            .adopt_derived(&produced, name, DerivedKind::Pdf, session_id)
    }

    /// Runs a stored batch archive and registers its result for the session.
    pub fn process_archive(
        &self,
        session_id: &str,
        name: &str,
        template: &Path,
        reporter: &dyn BatchReporter,
    ) -> Result<BatchOutcome, Error> {
        let path = self.owned_path(session_id, name)?;
        let extension = declared_extension(name).unwrap_or_default();
        if !UploadKind::from_extension(&extension).is_some_and(UploadKind::is_archive) {
            return Err(ValidationError::UnsupportedExtension(extension).into());
        }
        let _permit = self.admission.acquire()?;

        let outcome =
            self.processor
                .process_zip_file(&path, name, template, self.store.root(), reporter)?;
        self.store
            .track_generated_file(name, &outcome.result_name, session_id)?;
        Ok(outcome)
    }

    pub fn cleanup_old_files(&self) -> SweepReport {
        self.sweeper.sweep_aged()
    }

    pub fn cleanup_all_files(&self) -> SweepReport {
        self.sweeper.sweep_all()
    }

    fn owned_path(&self, session_id: &str, name: &str) -> Result<PathBuf, Error> {
        if !self.store.verify_ownership(session_id, name) {
            warn!(file = %name, "denied use by non-owning session");
            return Err(Error::Ownership(name.to_string()));
        }
        let path = self.store.load(name)?;
        if !path.is_file() {
            return Err(Error::NotFound(name.to_string()));
        }
        Ok(path)
    }
}

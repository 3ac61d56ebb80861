use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_storage_root")]
    pub storage_root: String,
    #[serde(default = "default_max_concurrent_conversions")]
    pub max_concurrent_conversions: usize,
    #[serde(default = "default_permit_timeout_secs")]
    pub permit_timeout_secs: u64,
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: u64,
    #[serde(default = "default_sweep_interval_minutes")]
    pub sweep_interval_minutes: u64,
    #[serde(default = "default_template_prefix")]
    pub template_prefix: String,
    /// Blank workbook copied when a period template is missing.
    #[serde(default)]
    pub template_source: Option<String>,
    /// External program invoked as `<cmd> <input> <template> <output_dir>`.
    #[serde(default)]
    pub converter_command: Option<String>,
    #[serde(default = "default_office_command")]
    pub office_command: String,
    #[serde(default = "default_max_archive_entries")]
    pub max_archive_entries: usize,
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,
}

fn default_storage_root() -> String {
    "uploads".to_string()
}

fn default_max_concurrent_conversions() -> usize {
    4
}

fn default_permit_timeout_secs() -> u64 {
    30
}

fn default_retention_minutes() -> u64 {
    60
}

fn default_sweep_interval_minutes() -> u64 {
    15
}

fn default_template_prefix() -> String {
    "timesheet-".to_string()
}

fn default_office_command() -> String {
    "soffice".to_string()
}

fn default_max_archive_entries() -> usize {
    500
}

fn default_max_archive_bytes() -> u64 {
    256 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            max_concurrent_conversions: default_max_concurrent_conversions(),
            permit_timeout_secs: default_permit_timeout_secs(),
            retention_minutes: default_retention_minutes(),
            sweep_interval_minutes: default_sweep_interval_minutes(),
            template_prefix: default_template_prefix(),
            template_source: None,
            converter_command: None,
            office_command: default_office_command(),
            max_archive_entries: default_max_archive_entries(),
            max_archive_bytes: default_max_archive_bytes(),
        }
    }
}

impl AppConfig {
    pub fn storage_root(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }

    pub fn permit_timeout(&self) -> Duration {
        Duration::from_secs(self.permit_timeout_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_minutes.saturating_mul(60))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes.max(1).saturating_mul(60))
    }
}

/// Reads `Config.toml` (optional) and then `SHEETGATE_*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("SHEETGATE").try_parsing(true))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

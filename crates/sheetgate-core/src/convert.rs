//! Seams to the document tooling that lives outside this crate.

use anyhow::{anyhow, bail, Context};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Turns one spreadsheet into an output document using a template.
pub trait SheetConverter: Send + Sync {
    fn convert(&self, input: &Path, template: &Path, output_dir: &Path) -> anyhow::Result<PathBuf>;
}

/// Renders an office document to PDF.
pub trait PdfRenderer: Send + Sync {
    fn render(&self, input: &Path, output_dir: &Path) -> anyhow::Result<PathBuf>;
}

/// Produces the blank workbook for one calendar month.
pub trait TemplateGenerator: Send + Sync {
    fn generate(&self, year: i32, month: u32, dest: &Path) -> anyhow::Result<()>;
}

/// Runs `<program> <input> <template> <output_dir>` and expects the output
/// path as the last non-empty line of stdout.
pub struct CommandConverter {
    program: String,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl SheetConverter for CommandConverter {
    fn convert(&self, input: &Path, template: &Path, output_dir: &Path) -> anyhow::Result<PathBuf> {
        debug!("{} {}", self.program, input.display());
        let output = Command::new(&self.program)
            .arg(input)
            .arg(template)
            .arg(output_dir)
            .output()
            .with_context(|| format!("failed to start converter '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "converter exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or("").trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let produced = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("converter printed no output path"))?;
        if !produced.is_file() {
            bail!("converter output {} does not exist", produced.display());
        }
        Ok(produced)
    }
}

/// Headless office suite: `<office> --headless --convert-to pdf --outdir <dir> <input>`.
pub struct OfficePdfRenderer {
    office: String,
}

impl OfficePdfRenderer {
    pub fn new(office: impl Into<String>) -> Self {
        Self {
            office: office.into(),
        }
    }
}

impl PdfRenderer for OfficePdfRenderer {
    fn render(&self, input: &Path, output_dir: &Path) -> anyhow::Result<PathBuf> {
        let status = Command::new(&self.office)
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(output_dir)
            .arg(input)
            .status()
            .with_context(|| format!("failed to start '{}'", self.office))?;
        if !status.success() {
            bail!("{} exited with {}", self.office, status);
        }

        let stem = input
            .file_stem()
            .ok_or_else(|| anyhow!("input {} has no file name", input.display()))?;
        let produced = output_dir.join(stem).with_extension("pdf");
        if !produced.is_file() {
            bail!("renderer produced no {}", produced.display());
        }
        Ok(produced)
    }
}

/// Copies a blank workbook into place.
pub struct CopyTemplateGenerator {
    source: PathBuf,
}

impl CopyTemplateGenerator {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl TemplateGenerator for CopyTemplateGenerator {
    /// Never replaces an existing file, symlinks included.
    fn generate(&self, year: i32, month: u32, dest: &Path) -> anyhow::Result<()> {
        let mut source = File::open(&self.source)
            .with_context(|| format!("opening template source {}", self.source.display()))?;
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .with_context(|| format!("creating {}", dest.display()))?;
        if let Err(e) = io::copy(&mut source, &mut out) {
            drop(out);
            let _ = fs::remove_file(dest);
            return Err(e).with_context(|| {
                format!(
                    "copying {} for {}-{:02}",
                    self.source.display(),
                    year,
                    month
                )
            });
        }
        Ok(())
    }
}

/// Used when no converter is configured; every entry fails with a clear reason.
pub struct UnconfiguredConverter;

impl SheetConverter for UnconfiguredConverter {
    fn convert(&self, input: &Path, _template: &Path, _output_dir: &Path) -> anyhow::Result<PathBuf> {
        bail!("no converter configured for {}", input.display())
    }
}

/// Used when no template source is configured; generation is skipped.
pub struct NoTemplates;

impl TemplateGenerator for NoTemplates {
    fn generate(&self, year: i32, month: u32, _dest: &Path) -> anyhow::Result<()> {
        bail!("no template source configured for {}-{:02}", year, month)
    }
}

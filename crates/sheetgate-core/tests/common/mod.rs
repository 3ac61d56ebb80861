#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use anyhow::bail;
use sheetgate_core::convert::{SheetConverter, TemplateGenerator};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Minimal bytes that pass the ZIP-container signature check.
pub fn xlsx_bytes(marker: &str) -> Vec<u8> {
    let mut data = vec![0x50, 0x4B, 0x03, 0x04];
    data.extend_from_slice(marker.as_bytes());
    data.resize(data.len().max(64), 0x20);
    data
}

/// Writes a zip with the given (entry name, content) members.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

pub fn zip_bytes(dir: &Path, entries: &[(&str, &[u8])]) -> Vec<u8> {
    let path = dir.join("fixture.zip");
    write_zip(&path, entries);
    let data = fs::read(&path).unwrap();
    fs::remove_file(&path).unwrap();
    data
}

pub fn set_age(path: &Path, age: Duration) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Writes `<stem>.docx` holding the input bytes; fails on inputs containing
/// `FAIL`.
#[derive(Default)]
pub struct FakeConverter {
    pub calls: AtomicUsize,
}

impl SheetConverter for FakeConverter {
    fn convert(&self, input: &Path, _template: &Path, output_dir: &Path) -> anyhow::Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let data = fs::read(input)?;
        if data.windows(4).any(|w| w == b"FAIL") {
            bail!("cell parse error in {}", input.display());
        }
        let stem = input.file_stem().unwrap().to_string_lossy();
        let out = output_dir.join(format!("{}.docx", stem));
        fs::write(&out, &data)?;
        Ok(out)
    }
}

pub struct BlankTemplates;

impl TemplateGenerator for BlankTemplates {
    fn generate(&self, year: i32, month: u32, dest: &Path) -> anyhow::Result<()> {
        fs::write(dest, format!("template {}-{:02}", year, month))?;
        Ok(())
    }
}

mod common;

use chrono::NaiveDate;
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

use common::{list_names, set_age, BlankTemplates};
use sheetgate_core::convert::{CopyTemplateGenerator, TemplateGenerator};
use sheetgate_core::retention::TemplatePattern;
use sheetgate_core::{RetentionSweeper, SweepScheduler};

const HOUR: Duration = Duration::from_secs(3600);

fn sweeper(root: &std::path::Path, generator: Arc<dyn TemplateGenerator>) -> RetentionSweeper {
    RetentionSweeper::new(
        root,
        HOUR,
        TemplatePattern::new("timesheet-").unwrap(),
        generator,
    )
}

fn november() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 14).unwrap()
}

#[test]
fn test_aged_sweep_spares_templates_and_fresh_files() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for name in ["timesheet-2025-11.xlsx", "report.xlsx", "fresh.xlsx"] {
        fs::write(root.join(name), b"data").unwrap();
    }
    set_age(&root.join("timesheet-2025-11.xlsx"), 3 * HOUR);
    set_age(&root.join("report.xlsx"), 3 * HOUR);

    let report = sweeper(root, Arc::new(BlankTemplates)).sweep_aged_at(SystemTime::now(), november());

    assert_eq!(report.deleted, 1);
    assert_eq!(report.bytes_freed, 4);
    assert_eq!(report.exempt, 1);
    assert_eq!(report.retained, 1);
    assert_eq!(report.failed, 0);
    assert!(!root.join("report.xlsx").exists());
    // Existing November template is not regenerated.
    assert_eq!(fs::read(root.join("timesheet-2025-11.xlsx")).unwrap(), b"data");
    assert_eq!(
        report.templates_created,
        vec!["timesheet-2025-10.xlsx", "timesheet-2025-12.xlsx"]
    );
    assert_eq!(
        list_names(root),
        vec![
            "fresh.xlsx",
            "timesheet-2025-10.xlsx",
            "timesheet-2025-11.xlsx",
            "timesheet-2025-12.xlsx",
        ]
    );
}

#[test]
fn test_sweeps_leave_subdirectories_alone() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let nested = root.join(".batch-inflight");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("entry.xlsx"), b"data").unwrap();
    set_age(&nested.join("entry.xlsx"), 5 * HOUR);
    fs::write(root.join("old.zip"), b"zip").unwrap();
    set_age(&root.join("old.zip"), 5 * HOUR);

    let sweeper = sweeper(root, Arc::new(BlankTemplates));
    let report = sweeper.sweep_aged_at(SystemTime::now(), november());
    assert_eq!(report.deleted, 1);
    assert!(nested.join("entry.xlsx").exists());

    let report = sweeper.sweep_all();
    assert_eq!(report.deleted, 0);
    assert!(nested.join("entry.xlsx").exists());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed_or_removed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("store");
    fs::create_dir(&root).unwrap();
    let outside = tmp.path().join("outside.xlsx");
    fs::write(&outside, b"keep").unwrap();
    std::os::unix::fs::symlink(&outside, root.join("link.xlsx")).unwrap();

    let report = sweeper(&root, Arc::new(BlankTemplates)).sweep_all();
    assert_eq!(report.deleted, 0);
    assert!(outside.exists());
    assert!(root.join("link.xlsx").symlink_metadata().is_ok());
}

#[test]
fn test_sweep_all_keeps_only_templates() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for name in [
        "timesheet-2026-01.xlsx",
        "abc_7c9e6679-7425-40de-944b-e07fc1f90ae7-00112233aabbccdd.xlsx",
        "abc_7c9e6679-7425-40de-944b-e07fc1f90ae7-00112233aabbccdd.docx",
        "timesheet-2026-01.xls",
    ] {
        fs::write(root.join(name), b"x").unwrap();
    }

    let report = sweeper(root, Arc::new(BlankTemplates)).sweep_all();

    assert_eq!(report.deleted, 3);
    assert_eq!(report.exempt, 1);
    assert!(report.templates_created.is_empty());
    assert_eq!(list_names(root), vec!["timesheet-2026-01.xlsx"]);
}

#[test]
fn test_prewarm_creates_three_and_is_idempotent() {
    let tmp = tempdir().unwrap();
    let sweeper = sweeper(tmp.path(), Arc::new(BlankTemplates));
    let jan = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();

    let created = sweeper.prewarm_templates(jan);
    assert_eq!(
        created,
        vec![
            "timesheet-2025-12.xlsx",
            "timesheet-2026-01.xlsx",
            "timesheet-2026-02.xlsx",
        ]
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("timesheet-2025-12.xlsx")).unwrap(),
        "template 2025-12"
    );

    fs::write(tmp.path().join("timesheet-2026-01.xlsx"), b"edited").unwrap();
    assert!(sweeper.prewarm_templates(jan).is_empty());
    assert_eq!(
        fs::read(tmp.path().join("timesheet-2026-01.xlsx")).unwrap(),
        b"edited"
    );
}

#[cfg(unix)]
#[test]
fn test_prewarm_never_writes_through_dangling_symlink() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("store");
    fs::create_dir(&root).unwrap();
    let blank = tmp.path().join("blank.xlsx");
    fs::write(&blank, b"PK\x03\x04blank").unwrap();
    let target = tmp.path().join("elsewhere.xlsx");
    std::os::unix::fs::symlink(&target, root.join("timesheet-2025-10.xlsx")).unwrap();

    let sweeper = sweeper(&root, Arc::new(CopyTemplateGenerator::new(&blank)));
    let created = sweeper.prewarm_templates(november());

    assert_eq!(created, vec!["timesheet-2025-11.xlsx", "timesheet-2025-12.xlsx"]);
    assert!(!target.exists());
    assert!(root.join("timesheet-2025-10.xlsx").symlink_metadata().is_ok());
}

struct RacingTemplates;

impl TemplateGenerator for RacingTemplates {
    fn generate(&self, _year: i32, _month: u32, dest: &std::path::Path) -> anyhow::Result<()> {
        // Another process creates the file first.
        fs::write(dest, b"theirs")?;
        let file = fs::OpenOptions::new().write(true).create_new(true).open(dest)?;
        drop(file);
        Ok(())
    }
}

#[test]
fn test_prewarm_leaves_concurrently_created_template() {
    let tmp = tempdir().unwrap();
    let sweeper = sweeper(tmp.path(), Arc::new(RacingTemplates));
    let created = sweeper.prewarm_templates(november());
    assert!(created.is_empty());
    assert_eq!(
        fs::read(tmp.path().join("timesheet-2025-11.xlsx")).unwrap(),
        b"theirs"
    );
}

struct FailingTemplates;

impl TemplateGenerator for FailingTemplates {
    fn generate(&self, _year: i32, _month: u32, dest: &std::path::Path) -> anyhow::Result<()> {
        fs::write(dest, b"half")?;
        anyhow::bail!("generator crashed")
    }
}

#[test]
fn test_failed_generation_leaves_nothing_behind() {
    let tmp = tempdir().unwrap();
    let sweeper = sweeper(tmp.path(), Arc::new(FailingTemplates));
    let report = sweeper.sweep_aged_at(SystemTime::now(), november());
    assert!(report.templates_created.is_empty());
    assert!(list_names(tmp.path()).is_empty());
}

#[test]
fn test_missing_root_is_counted_not_raised() {
    let tmp = tempdir().unwrap();
    let sweeper = sweeper(&tmp.path().join("gone"), Arc::new(BlankTemplates));
    let report = sweeper.sweep_all();
    assert_eq!(report.failed, 1);
    assert_eq!(report.deleted, 0);
}

#[test]
fn test_scheduler_sweeps_until_stopped() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    fs::write(root.join("stale.xlsx"), b"old").unwrap();
    set_age(&root.join("stale.xlsx"), 2 * HOUR);

    let scheduler = SweepScheduler::spawn(
        Arc::new(sweeper(&root, Arc::new(BlankTemplates))),
        Duration::from_millis(20),
    )
    .unwrap();

    let mut waited = Duration::ZERO;
    while root.join("stale.xlsx").exists() && waited < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(10));
        waited += Duration::from_millis(10);
    }
    scheduler.stop();
    assert!(!root.join("stale.xlsx").exists());

    // No further sweeps after stop.
    fs::write(root.join("later.xlsx"), b"new").unwrap();
    set_age(&root.join("later.xlsx"), 2 * HOUR);
    thread::sleep(Duration::from_millis(100));
    assert!(root.join("later.xlsx").exists());
}

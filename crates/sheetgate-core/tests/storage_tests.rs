mod common;

use regex::Regex;
use std::fs;
use std::io::Read;
use std::sync::Arc;
use tempfile::tempdir;

use common::xlsx_bytes;
use sheetgate_core::hasher::hash_bytes;
use sheetgate_core::{DerivedKind, Error, ErrorKind, FileStore, OwnershipRegistry, ValidationError};

fn open_store(root: &std::path::Path) -> FileStore {
    FileStore::open(root, Arc::new(OwnershipRegistry::new())).unwrap()
}

#[test]
fn test_store_names_and_registers_upload() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let data = xlsx_bytes("invoice");

    let stored = store.store(&data, "invoice.xlsx", "abc123456789").unwrap();

    assert!(
        Regex::new(r"^abc123456789_[0-9a-f-]{36}-[0-9a-f]{16}\.xlsx$")
            .unwrap()
            .is_match(&stored.name),
        "unexpected name {}",
        stored.name
    );
    assert!(stored.name.contains(&hash_bytes(&data).short()));
    assert_eq!(stored.content_hash, hash_bytes(&data).to_hex());
    assert_eq!(stored.size, data.len() as u64);
    assert_eq!(stored.path.parent().unwrap(), store.root());
    assert_eq!(fs::read(&stored.path).unwrap(), data);

    assert!(store.verify_ownership("abc123456789", &stored.name));
    assert!(!store.verify_ownership("other-session", &stored.name));
}

#[test]
fn test_same_bytes_get_distinct_names_with_same_fragment() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let data = xlsx_bytes("same");

    let a = store.store(&data, "a.xlsx", "session-one").unwrap();
    let b = store.store(&data, "b.xlsx", "session-one").unwrap();

    assert_ne!(a.name, b.name);
    assert_eq!(a.content_hash, b.content_hash);
    assert!(a.name.ends_with(&format!("-{}.xlsx", hash_bytes(&data).short())));
}

#[test]
fn test_long_session_id_is_truncated_and_sanitized() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let stored = store
        .store(&xlsx_bytes("x"), "x.xlsx", "../A1B2-C3D4/E5F6G7H8I9")
        .unwrap();
    assert!(stored.name.starts_with("A1B2C3D4E5F6_"));
    assert!(store.verify_ownership("../A1B2-C3D4/E5F6G7H8I9", &stored.name));
}

#[test]
fn test_rejected_uploads_write_nothing() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    let mut exe = vec![0x4D, 0x5A, 0x00, 0x00];
    exe.resize(256, 0);
    let err = store.store(&exe, "payroll.xlsx", "s").unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::ExecutableSignature(_))
    ));

    let err = store.store(&[], "empty.xlsx", "s").unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::Empty)));

    let err = store.store(b"plain text pretending", "fake.xlsx", "s").unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::SignatureMismatch { .. })
    ));

    let err = store.store(&xlsx_bytes("ok"), "ok.xlsx", "").unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::MissingSession)));

    assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
    assert!(store.registry().is_empty());
}

#[test]
fn test_declared_directories_do_not_leak_into_names() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let stored = store
        .store(&xlsx_bytes("x"), "../../etc/cron.d/job.xlsx", "sess")
        .unwrap();
    assert_eq!(stored.path.parent().unwrap(), store.root());
}

#[test]
fn test_load_rejects_traversal() {
    let tmp = tempdir().unwrap();
    let store = open_store(&tmp.path().join("store"));
    fs::write(tmp.path().join("secret.txt"), b"secret").unwrap();

    for name in ["../secret.txt", "..", "sub/../../secret.txt", "/etc/passwd"] {
        let err = store.load(name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Traversal, "{}", name);
    }
}

#[test]
fn test_load_as_resource_distinguishes_missing() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let err = store.load_as_resource("nobody_x-y.xlsx").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(err.kind().status(), 404);
}

#[test]
fn test_open_for_session_enforces_ownership() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let data = xlsx_bytes("mine");
    let stored = store.store(&data, "mine.xlsx", "owner-session").unwrap();

    let mut resource = store.open_for_session("owner-session", &stored.name).unwrap();
    let mut read_back = Vec::new();
    resource.file.read_to_end(&mut read_back).unwrap();
    assert_eq!(read_back, data);
    assert_eq!(resource.size, data.len() as u64);

    let err = store.open_for_session("intruder", &stored.name).unwrap_err();
    assert!(matches!(err, Error::Ownership(_)));
    let err = store.open_for_session("", &stored.name).unwrap_err();
    assert!(matches!(err, Error::Ownership(_)));
}

#[test]
fn test_adopt_derived_keeps_traceable_chain() {
    let tmp = tempdir().unwrap();
    let store = open_store(&tmp.path().join("store"));
    let stored = store.store(&xlsx_bytes("src"), "src.xlsx", "sess").unwrap();

    let produced = tmp.path().join("out.docx");
    fs::write(&produced, b"docx bytes").unwrap();
    let derived = store
        .adopt_derived(&produced, &stored.name, DerivedKind::Document, "sess")
        .unwrap();

    let stem = stored.name.trim_end_matches(".xlsx");
    assert_eq!(derived.name, format!("{}.docx", stem));
    assert!(!produced.exists());
    assert_eq!(fs::read(&derived.path).unwrap(), b"docx bytes");
    assert!(store.verify_ownership("sess", &derived.name));
    assert!(!store.verify_ownership("other", &derived.name));
}

#[test]
fn test_track_generated_file_rejects_escaping_names() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let err = store
        .track_generated_file("a_t-h.xlsx", "../a_t-h.pdf", "sess")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Traversal);

    store
        .track_generated_file("a_t-h.xlsx", "a_t-h.pdf", "sess")
        .unwrap();
    assert!(store.verify_ownership("sess", "a_t-h.pdf"));
    assert_eq!(
        store.derived_name("a_t-h.zip", DerivedKind::ResultArchive),
        "a_t-h-result.zip"
    );
}

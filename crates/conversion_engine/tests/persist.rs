use std::fs;

use conversion_engine::{ensure_output_dir, save_result, AtomicFileWriter, BlobStore, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write(".converter_state.ron", "(theme: Light)").unwrap();
    assert_eq!(first.file_name().unwrap(), ".converter_state.ron");
    assert_eq!(fs::read_to_string(&first).unwrap(), "(theme: Light)");

    let second = writer.write(".converter_state.ron", "(theme: Dark)").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "(theme: Dark)");
}

#[test]
fn no_partial_file_when_output_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("report.pdf", "data");
    assert!(matches!(result, Err(PersistError::OutputDir(_))));
    assert!(!file_path.with_file_name("report.pdf").exists());
}

#[test]
fn save_result_writes_blob_bytes() {
    let temp = TempDir::new().unwrap();
    let blobs = BlobStore::new("test");
    let url = blobs.create_object_url(b"%PDF-1.7".to_vec(), Some("application/pdf".into()));

    let saved = save_result(&blobs, &url, &temp.path().join("out"), "report.pdf").unwrap();
    assert_eq!(fs::read(&saved).unwrap(), b"%PDF-1.7");
}

#[test]
fn save_result_after_revoke_fails() {
    let temp = TempDir::new().unwrap();
    let blobs = BlobStore::default();
    let url = blobs.create_object_url(b"x".to_vec(), None);
    assert!(blobs.revoke_object_url(&url));

    let err = save_result(&blobs, &url, temp.path(), "report.pdf").unwrap_err();
    assert!(matches!(err, PersistError::MissingBlob(_)));
}

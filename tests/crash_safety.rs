use json_products::persist::{atomic_write, temp_path as tmp_sibling};
use json_products::ProductStore;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("products_test_{}.json", name))
}

#[test]
fn open_missing_file_creates_empty_array() {
    let path = temp_path("missing");
    let _ = std::fs::remove_file(&path);
    let store = ProductStore::open(&path).unwrap();
    assert!(store.load().is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn corrupt_document_degrades_to_empty() {
    let path = temp_path("corrupt");
    std::fs::write(&path, "{not json").unwrap();
    let store = ProductStore::open(&path).unwrap();
    assert!(store.load().is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn corruption_after_open_is_reset_on_next_load() {
    let path = temp_path("corrupt_later");
    let _ = std::fs::remove_file(&path);
    let store = ProductStore::open(&path).unwrap();
    std::fs::write(&path, "[{\"id\": 1,").unwrap();
    assert!(store.load().is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn non_array_document_is_treated_as_corrupt() {
    let path = temp_path("not_array");
    std::fs::write(&path, r#"{"id": 1}"#).unwrap();
    let store = ProductStore::open(&path).unwrap();
    assert!(store.load().is_empty());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn empty_file_is_initialized() {
    let path = temp_path("empty_file");
    std::fs::write(&path, "").unwrap();
    let store = ProductStore::open(&path).unwrap();
    assert!(store.load().is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn atomic_write_leaves_no_temp_file() {
    let path = temp_path("atomic");
    let _ = std::fs::remove_file(&path);
    atomic_write(&path, b"[]").unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"[]");
    assert!(!tmp_sibling(&path).exists());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn failed_write_is_reported_by_save() {
    // A directory in place of the document makes the rename fail.
    let path = temp_path("dir_in_the_way");
    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_dir_all(&path);
    let store = ProductStore::open(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let err = store.save(&Vec::new()).unwrap_err();
    assert!(matches!(err, json_products::Error::Io { .. }));
    assert_eq!(err.path(), Some(path.as_path()));

    let _ = std::fs::remove_dir_all(&path);
    let _ = std::fs::remove_file(tmp_sibling(&path));
}

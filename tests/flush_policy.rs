use json_products::{FlushPolicy, ProductStore, Record};
use std::time::{Duration, Instant};

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("products_test_{}.json", name))
}

fn one_product() -> Vec<Record> {
    vec![Record::from_json(br#"{"id": 1, "name": "Lamp"}"#).unwrap()]
}

fn on_disk(path: &std::path::Path) -> usize {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str::<Vec<serde_json::Value>>(&text)
        .unwrap()
        .len()
}

#[test]
fn immediate_writes_on_save() {
    let path = temp_path("immediate");
    let _ = std::fs::remove_file(&path);
    let store = ProductStore::open_with_policy(&path, FlushPolicy::Immediate).unwrap();
    store.save(&one_product()).unwrap();
    assert_eq!(on_disk(&path), 1);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn manual_flush_only_on_call() {
    let path = temp_path("manual");
    let _ = std::fs::remove_file(&path);
    let store = ProductStore::open_with_policy(&path, FlushPolicy::Manual).unwrap();
    store.save(&one_product()).unwrap();
    assert_eq!(on_disk(&path), 0);
    assert_eq!(store.load().len(), 1);

    store.flush().unwrap();
    assert_eq!(on_disk(&path), 1);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn manual_policy_ignores_external_edits() {
    let path = temp_path("manual_cached");
    let _ = std::fs::remove_file(&path);
    let store = ProductStore::open_with_policy(&path, FlushPolicy::Manual).unwrap();
    std::fs::write(&path, r#"[{"id": 9}]"#).unwrap();
    assert!(store.load().is_empty());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn async_flush_eventually_writes() {
    let path = temp_path("async_timer");
    let _ = std::fs::remove_file(&path);
    let store =
        ProductStore::open_with_policy(&path, FlushPolicy::Async(Duration::from_millis(20)))
            .unwrap();
    store.save(&one_product()).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while on_disk(&path) == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(on_disk(&path), 1);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn async_flush_worker_flushes_on_drop() {
    let path = temp_path("async_drop");
    let _ = std::fs::remove_file(&path);
    let store =
        ProductStore::open_with_policy(&path, FlushPolicy::Async(Duration::from_secs(60)))
            .unwrap();
    store.save(&one_product()).unwrap();
    drop(store);
    assert_eq!(on_disk(&path), 1);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn zero_async_interval_is_rejected() {
    let path = temp_path("async_zero");
    let err = ProductStore::builder(&path)
        .policy(FlushPolicy::Async(Duration::ZERO))
        .build()
        .unwrap_err();
    assert!(matches!(err, json_products::Error::Config(_)));
}

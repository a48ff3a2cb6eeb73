use std::sync::Arc;

use serde_json::json;

use passages_core::cache::{FileStorage, Storage, CACHE_KEY};
use passages_core::CacheStore;

#[test]
fn file_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path().join("nested")).unwrap();

    assert_eq!(storage.get_item("k").unwrap(), None);
    storage.set_item("k", "{\"a\":1}").unwrap();
    assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("{\"a\":1}"));
    assert!(dir.path().join("nested").join("k.json").exists());

    storage.remove_item("k").unwrap();
    assert_eq!(storage.get_item("k").unwrap(), None);
    // Removing a missing key is not an error
    storage.remove_item("k").unwrap();
}

#[test]
fn corrupt_file_is_deleted_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(format!("{}.json", CACHE_KEY));
    std::fs::write(&path, "truncated {").unwrap();

    let cache = CacheStore::open(dir.path().to_path_buf()).unwrap();

    assert!(!cache.is_valid());
    assert!(!path.exists());
}

#[test]
fn cache_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let data = vec![json!({"id": 1, "commune": "Le Lamentin"}), json!({"id": 2})];

    let cache = CacheStore::new(Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap()));
    assert!(cache.set(&data));

    let reopened = CacheStore::open(dir.path().to_path_buf()).unwrap();
    assert_eq!(reopened.get(), Some(data));
    assert_eq!(reopened.age_hours(), Some(0));
}

//! Tests for ConnectionStore (connections.json)

use std::fs;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use ttyf::application::store::ConnectionStore;
use ttyf::domain::{Connection, ConnectionRegistry};
use ttyf::infrastructure::traits::RealFileSystem;

fn store(temp: &TempDir) -> ConnectionStore {
    ConnectionStore::new(Arc::new(RealFileSystem), temp.path().join("connections.json"))
}

fn connection(id: &str, name: &str) -> Connection {
    let added = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    Connection::new(id, name, added).unwrap()
}

#[test]
fn given_missing_file_when_load_then_empty_registry() {
    let temp = TempDir::new().unwrap();

    let registry = store(&temp).load().unwrap();

    assert!(registry.is_empty());
}

#[test]
fn given_corrupt_file_when_load_then_empty_registry() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    fs::write(store.path(), "[{broken").unwrap();

    let registry = store.load().unwrap();

    assert!(registry.is_empty());
}

#[test]
fn given_registry_when_saved_then_pretty_json_array_in_order() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    let registry = ConnectionRegistry::new(vec![
        connection("item-b", "savings"),
        connection("item-a", "chequing"),
    ]);

    store.save(&registry).unwrap();

    let content = fs::read_to_string(store.path()).unwrap();
    assert!(content.contains('\n'), "expected indented JSON");
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json[0]["id"], "item-b");
    assert_eq!(json[0]["name"], "savings");
    assert_eq!(json[0]["date_added"], "2024-03-01 09:30:00");
    assert_eq!(json[1]["name"], "chequing");
    assert_eq!(store.load().unwrap(), registry);
}

#[test]
fn given_missing_storage_dir_when_saved_then_creates_it() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("connections.json");
    let store = ConnectionStore::new(Arc::new(RealFileSystem), path.clone());

    store
        .save(&ConnectionRegistry::new(vec![connection("item-1", "bank")]))
        .unwrap();

    assert!(path.exists());
}

//! Integration tests for the path-to-instance registry.

use durable_list::{ListRegistry, PersistentList, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_lookups_for_one_path_share_one_instance() {
    let temp_dir = TempDir::new().unwrap();
    let registry = ListRegistry::new();
    let path = temp_dir.path().join("shared.bin");

    let first = registry.get_or_create(&path).unwrap();
    let second = registry.get_or_create(&path).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    first.add("written via first").unwrap();
    assert_eq!(second.count().unwrap(), 1);
}

#[test]
fn test_distinct_paths_get_distinct_instances() {
    let temp_dir = TempDir::new().unwrap();
    let registry = ListRegistry::new();

    let a = registry
        .get_or_create(temp_dir.path().join("a.bin"))
        .unwrap();
    let b = registry
        .get_or_create(temp_dir.path().join("b.bin"))
        .unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len().unwrap(), 2);

    a.add("only in a").unwrap();
    assert_eq!(b.count().unwrap(), 0);
}

#[test]
fn test_get_or_create_loads_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("preexisting.bin");

    {
        let list = PersistentList::open_or_create(&path).unwrap();
        list.add_all(["kept", "on", "disk"]).unwrap();
    }

    let registry = ListRegistry::new();
    let list = registry.get_or_create(&path).unwrap();
    assert_eq!(list.count().unwrap(), 3);
    assert_eq!(list.at(0).unwrap(), Value::from("kept"));
}

#[test]
fn test_paths_reports_registered_collections() {
    let temp_dir = TempDir::new().unwrap();
    let registry = ListRegistry::new();
    assert!(registry.is_empty().unwrap());

    registry
        .get_or_create(temp_dir.path().join("one.bin"))
        .unwrap();
    registry
        .get_or_create(temp_dir.path().join("two.bin"))
        .unwrap();

    let mut names: Vec<String> = registry
        .paths()
        .unwrap()
        .into_iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, ["one.bin", "two.bin"]);
}

#[test]
fn test_full_lifecycle_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let registry = ListRegistry::new();
    let path = temp_dir.path().join("lifecycle.bin");

    let list = registry.get_or_create(&path).unwrap();
    list.add_all(["a", "b", "c"]).unwrap();
    assert_eq!(list.count().unwrap(), 3);
    assert_eq!(list.at(1).unwrap(), Value::from("b"));

    list.remove_at(0).unwrap();
    assert_eq!(
        list.snapshot().unwrap(),
        vec![Value::from("b"), Value::from("c")]
    );
    {
        let on_disk = PersistentList::open_or_create(&path).unwrap();
        assert_eq!(
            on_disk.snapshot().unwrap(),
            vec![Value::from("b"), Value::from("c")]
        );
    }

    assert!(registry.purge(&path, true).unwrap());
    assert!(!path.exists());

    let fresh = registry.get_or_create(&path).unwrap();
    assert!(!Arc::ptr_eq(&fresh, &list));
    assert_eq!(fresh.count().unwrap(), 0);
}

#[test]
fn test_purge_is_scoped_to_tracked_entries() {
    let temp_dir = TempDir::new().unwrap();
    let registry = ListRegistry::new();
    let path = temp_dir.path().join("untracked.bin");

    // File exists on disk but was never opened through this registry.
    fs::write(&path, b"whatever").unwrap();
    assert!(!registry.purge(&path, true).unwrap());
    assert!(path.exists(), "purge must not touch files it does not track");
}

#[test]
fn test_purged_handle_keeps_working_in_memory() {
    let temp_dir = TempDir::new().unwrap();
    let registry = ListRegistry::new();
    let path = temp_dir.path().join("detached.bin");

    let list = registry.get_or_create(&path).unwrap();
    list.add("before purge").unwrap();
    registry.purge(&path, false).unwrap();

    // Existing holders keep a functional collection; the registry just no
    // longer hands it out.
    list.add("after purge").unwrap();
    assert_eq!(list.count().unwrap(), 2);

    let replacement = registry.get_or_create(&path).unwrap();
    assert!(!Arc::ptr_eq(&replacement, &list));
    assert_eq!(replacement.count().unwrap(), 2);
}

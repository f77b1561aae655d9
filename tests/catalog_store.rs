//! Catalog Store Integration Tests
//!
//! Tests for catalog file round-trips, backup-before-write and restore.

use cataloger::domain::CatalogPath;
use cataloger::library::{CatalogError, CatalogStore, WriteOutcome};
use tempfile::TempDir;

const EXISTING: &str = "\
# This is an Asset Catalog Definition file for Blender.
# Hand edited.
VERSION 1
0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60:Props/Chairs:Chairs
6a1d5e4f-2b3c-4d5e-9f80-7a6b5c4d3e2f:Lighting:Lighting
";

fn path(s: &str) -> CatalogPath {
    CatalogPath::parse(s).unwrap()
}

fn store_with(content: Option<&str>) -> (TempDir, CatalogStore) {
    let temp = TempDir::new().unwrap();
    let store = CatalogStore::for_library(temp.path());
    if let Some(content) = content {
        std::fs::write(store.catalog_file(), content).unwrap();
    }
    (temp, store)
}

#[test]
fn test_load_missing_file_is_empty() {
    let (_temp, store) = store_with(None);

    let tree = store.load().unwrap();
    assert!(tree.is_empty());
    assert!(!store.status().catalog_exists);
}

#[test]
fn test_roundtrip_keeps_existing_and_adds_new() {
    let (_temp, store) = store_with(Some(EXISTING));

    let mut tree = store.load().unwrap();
    let created = tree.merge(&[path("Auto/Chair"), path("Props/Chairs")]);
    assert_eq!(created.len(), 1);
    store.write(&mut tree).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.len(), 3);
    assert_eq!(
        reloaded.get(&path("Props/Chairs")).unwrap().id.to_string(),
        "0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60"
    );
    assert_eq!(reloaded.get(&path("Auto/Chair")).unwrap().id, created[0].id);

    let written = std::fs::read_to_string(store.catalog_file()).unwrap();
    assert!(written.starts_with(EXISTING));
}

#[test]
fn test_second_run_adds_nothing() {
    let (_temp, store) = store_with(Some(EXISTING));
    let wanted = [path("Auto/Chair"), path("Auto/Lamp")];

    let mut tree = store.load().unwrap();
    tree.merge(&wanted);
    store.write(&mut tree).unwrap();
    let after_first = std::fs::read(store.catalog_file()).unwrap();
    let backup_after_first = std::fs::read(store.backup_file()).unwrap();

    let mut tree = store.load().unwrap();
    let created = tree.merge(&wanted);
    assert!(created.is_empty());
    assert_eq!(store.write(&mut tree).unwrap(), WriteOutcome::Unchanged);

    assert_eq!(std::fs::read(store.catalog_file()).unwrap(), after_first);
    assert_eq!(std::fs::read(store.backup_file()).unwrap(), backup_after_first);
}

#[test]
fn test_backup_matches_pre_write_content() {
    let (_temp, store) = store_with(Some(EXISTING));

    let mut tree = store.load().unwrap();
    tree.merge(&[path("Auto/Lamp")]);
    let outcome = store.write(&mut tree).unwrap();

    assert_eq!(
        outcome,
        WriteOutcome::Written {
            created: 1,
            backup: Some(store.backup_file().to_path_buf()),
        }
    );
    assert_eq!(std::fs::read_to_string(store.backup_file()).unwrap(), EXISTING);
}

#[test]
fn test_no_op_write_takes_no_backup() {
    let (_temp, store) = store_with(Some(EXISTING));

    let mut tree = store.load().unwrap();
    assert_eq!(store.write(&mut tree).unwrap(), WriteOutcome::Unchanged);
    assert!(!store.backup_file().exists());
}

#[test]
fn test_first_write_creates_file_without_backup() {
    let (_temp, store) = store_with(None);

    let mut tree = store.load().unwrap();
    tree.merge(&[path("Auto/Chair")]);
    let outcome = store.write(&mut tree).unwrap();

    assert_eq!(outcome, WriteOutcome::Written { created: 1, backup: None });
    assert!(store.catalog_file().exists());
    assert!(!store.backup_file().exists());

    let content = std::fs::read_to_string(store.catalog_file()).unwrap();
    assert!(content.contains("VERSION 1"));
    assert!(content.contains(":Auto/Chair:Chair"));
}

#[test]
fn test_backup_failure_leaves_primary_untouched() {
    let (_temp, store) = store_with(Some(EXISTING));
    // A directory in the backup's place makes the copy fail
    std::fs::create_dir(store.backup_file()).unwrap();

    let mut tree = store.load().unwrap();
    tree.merge(&[path("Auto/Lamp")]);
    let result = store.write(&mut tree);

    assert!(matches!(result, Err(CatalogError::BackupWrite { .. })));
    assert_eq!(std::fs::read_to_string(store.catalog_file()).unwrap(), EXISTING);
}

#[test]
fn test_restore_roundtrips_bytes() {
    let (_temp, store) = store_with(Some(EXISTING));

    let mut tree = store.load().unwrap();
    tree.merge(&[path("Auto/Lamp")]);
    store.write(&mut tree).unwrap();
    assert_ne!(std::fs::read_to_string(store.catalog_file()).unwrap(), EXISTING);

    store.restore().unwrap();
    assert_eq!(std::fs::read_to_string(store.catalog_file()).unwrap(), EXISTING);
}

#[test]
fn test_restore_without_backup() {
    let (_temp, store) = store_with(Some(EXISTING));

    match store.restore() {
        Err(CatalogError::BackupNotFound(path)) => assert_eq!(path, store.backup_file()),
        other => panic!("Expected BackupNotFound, got {:?}", other),
    }
    assert_eq!(std::fs::read_to_string(store.catalog_file()).unwrap(), EXISTING);
}

#[test]
fn test_malformed_file_is_reported() {
    let (_temp, store) = store_with(Some("VERSION 1\nthis is not a catalog\n"));

    match store.load() {
        Err(CatalogError::Parse { line, .. }) => assert_eq!(line, 2),
        other => panic!("Expected parse error, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn test_aliased_catalogs_survive_write() {
    let aliased = "\
VERSION 1
0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60:Props:Props
6a1d5e4f-2b3c-4d5e-9f80-7a6b5c4d3e2f:Props:Props Alias
";
    let (_temp, store) = store_with(Some(aliased));

    let mut tree = store.load().unwrap();
    assert_eq!(tree.merge(&[path("Props"), path("Auto/Lamp")]).len(), 1);
    store.write(&mut tree).unwrap();

    let written = std::fs::read_to_string(store.catalog_file()).unwrap();
    assert!(written.starts_with(aliased));
    assert_eq!(store.load().unwrap().len(), 3);
}

#[test]
fn test_crlf_file_keeps_untouched_bytes() {
    let crlf = EXISTING.replace('\n', "\r\n");
    let (_temp, store) = store_with(Some(&crlf));

    let mut tree = store.load().unwrap();
    tree.merge(&[path("Auto/Chair")]);
    store.write(&mut tree).unwrap();

    let written = std::fs::read_to_string(store.catalog_file()).unwrap();
    assert!(written.starts_with(&crlf));
    assert!(written.ends_with("\r\n"));
}

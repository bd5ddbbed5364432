//! Durability and atomicity integration tests for the file store.
//!
//! # Crash Simulation
//!
//! We simulate a crash by dropping the `ProviderIndex` handle without
//! calling `close()`, and by leaving behind the kind of temporary files an
//! interrupted `save` produces. Every insert is committed to disk before it
//! is published, so neither case may lose an acknowledged insert.

use std::fs;
use std::path::Path;

use provider_index::{
    prepare, Config, FileStore, HashingEncoder, ProviderIndex, ProviderIndexError, ProviderRecord,
    ProviderStore, StartupError, SyncMode,
};
use tempfile::tempdir;

fn seed(dir: &Path) {
    let config = Config::default();
    prepare::seed(
        &FileStore::new(dir, &config),
        &HashingEncoder::new(config.dimension()),
        vec![ProviderRecord::new("Helping Hands", "Food pantry and hot meals").unwrap()],
    )
    .unwrap();
}

fn open(dir: &Path) -> ProviderIndex {
    ProviderIndex::open(dir, Config::default()).unwrap()
}

// ============================================================================
// Durability Tests
// ============================================================================

#[test]
fn test_committed_insert_survives_normal_close() {
    let dir = tempdir().unwrap();
    seed(dir.path());

    let index = open(dir.path());
    index.insert("Durable Org", "Shelter").unwrap();
    index.close().unwrap();

    let index = open(dir.path());
    assert_eq!(index.len(), 2);
    assert_eq!(index.snapshot().records()[1].name(), "Durable Org");
}

#[test]
fn test_committed_insert_survives_crash() {
    let dir = tempdir().unwrap();
    seed(dir.path());

    {
        let index = open(dir.path());
        index.insert("Crash Safe", "Shelter").unwrap();
        // NO close() -- simulates crash
    }

    let index = open(dir.path());
    assert_eq!(index.len(), 2);
    assert_eq!(index.snapshot().records()[1].name(), "Crash Safe");
}

#[test]
fn test_multiple_crash_cycles() {
    let dir = tempdir().unwrap();
    seed(dir.path());

    for cycle in 0..5 {
        let index = open(dir.path());
        assert_eq!(index.len(), 1 + cycle);
        index
            .insert(&format!("Cycle {cycle}"), "Utility assistance")
            .unwrap();
        // dropped without close
    }

    let index = open(dir.path());
    assert_eq!(index.len(), 6);
    let snapshot = index.snapshot();
    assert_eq!(snapshot.records().len(), snapshot.matrix().rows());
}

#[test]
fn test_every_sync_mode_is_durable() {
    for sync_mode in [SyncMode::Fast, SyncMode::Normal, SyncMode::Paranoid] {
        let dir = tempdir().unwrap();
        seed(dir.path());
        let config = Config {
            sync_mode,
            ..Default::default()
        };

        {
            let index = ProviderIndex::open(dir.path(), config.clone()).unwrap();
            index.insert("Synced Org", "Shelter").unwrap();
        }

        let index = ProviderIndex::open(dir.path(), config).unwrap();
        assert_eq!(index.len(), 2, "sync_mode={sync_mode:?}");
    }
}

// ============================================================================
// Atomicity Tests
// ============================================================================

#[test]
fn test_interrupted_save_leftovers_are_ignored() {
    let dir = tempdir().unwrap();
    seed(dir.path());

    // What a save killed between staging and replacing leaves behind.
    fs::write(dir.path().join(".providers.json.a1b2c3.tmp"), b"[{\"Provider\": \"half").unwrap();
    fs::write(dir.path().join(".embeddings.npy.d4e5f6.tmp"), b"\x93NUMPY").unwrap();

    let index = open(dir.path());
    assert_eq!(index.len(), 1);

    index.insert("After Crash", "Shelter").unwrap();
    assert_eq!(open(dir.path()).len(), 2);
}

/// Leaves `dir` as a save killed between the two renames would: the record
/// list already holds the new entry, the matrix does not, and the backup of
/// the previous record list is still in place.
fn crash_between_renames(dir: &Path) -> std::path::PathBuf {
    let store = FileStore::new(dir, &Config::default());
    let backup = dir.join(".providers.json.f7a8b9.tmp");
    fs::copy(store.records_path(), &backup).unwrap();
    fs::write(
        store.records_path(),
        r#"[{"Provider": "Helping Hands", "Services": "Food pantry and hot meals"},
            {"Provider": "Test Org", "Services": "Utility assistance"}]"#,
    )
    .unwrap();
    backup
}

fn assert_row_count_mismatch(dir: &Path) {
    let err = ProviderIndex::open(dir, Config::default()).unwrap_err();
    assert!(
        matches!(
            err,
            ProviderIndexError::Startup(StartupError::RowCountMismatch { records: 2, rows: 1 })
        ),
        "{err}"
    );
}

#[test]
fn test_crash_between_renames_recovers_from_backup() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let backup = crash_between_renames(dir.path());
    assert_row_count_mismatch(dir.path());

    fs::rename(&backup, dir.path().join("providers.json")).unwrap();

    let index = open(dir.path());
    assert_eq!(index.len(), 1);
    assert_eq!(index.snapshot().records()[0].name(), "Helping Hands");
}

#[test]
fn test_crash_between_renames_recovers_by_rebuild() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    crash_between_renames(dir.path());
    assert_row_count_mismatch(dir.path());

    assert_eq!(prepare::rebuild(dir.path(), &Config::default()).unwrap(), 2);

    let index = open(dir.path());
    assert_eq!(index.len(), 2);
    let results = index.search("Test Org. Utility assistance", 1).unwrap();
    assert_eq!(results[0].provider.name(), "Test Org");
}

#[test]
fn test_save_only_touches_committed_names() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    open(dir.path()).insert("Test Org", "Utility assistance").unwrap();

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        [".provider-index.lock", "embeddings.npy", "providers.json"]
    );
}

#[test]
fn test_record_list_on_disk_format() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    open(dir.path()).insert("Test Org", "Utility assistance").unwrap();

    let json: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("providers.json")).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"Provider": "Helping Hands", "Services": "Food pantry and hot meals"},
            {"Provider": "Test Org", "Services": "Utility assistance"}
        ])
    );
}

#[test]
fn test_matrix_on_disk_format() {
    let dir = tempdir().unwrap();
    seed(dir.path());

    let bytes = fs::read(dir.path().join("embeddings.npy")).unwrap();
    assert_eq!(&bytes[..6], b"\x93NUMPY");
    assert_eq!(bytes[6], 1);
    let header_len = usize::from(u16::from_le_bytes([bytes[8], bytes[9]]));
    let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
    assert!(header.contains("'descr': '<f4'"), "{header}");
    assert!(header.contains("'shape': (1, 384)"), "{header}");
    assert_eq!(bytes.len(), 10 + header_len + 384 * 4);
}

#[test]
fn test_store_location() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path(), &Config::default());
    assert_eq!(store.location(), Some(dir.path()));
    assert_eq!(store.records_path(), dir.path().join("providers.json"));
    assert_eq!(store.embeddings_path(), dir.path().join("embeddings.npy"));
}

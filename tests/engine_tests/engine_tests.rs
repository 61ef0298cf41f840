//! Tests for Engine
//!
//! These tests verify:
//! - Engine lifecycle (open empty, load, reopen)
//! - Point lookups through the primary index
//! - Recovery of a missing index or link table
//! - Detection of corrupted sidecar files

use std::fs;

use seqset::config::Config;
use seqset::engine::Engine;
use seqset::SeqSetError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const HEADER: &str = "zip_code,place_name,state,latitude,longitude";

fn postal_lines() -> Vec<String> {
    let mut lines = vec![HEADER.to_string()];
    for (i, place) in ["Adjuntas", "Aguada", "Aguadilla", "Maricao", "Anasco", "Utuado"]
        .iter()
        .enumerate()
    {
        lines.push(format!(
            "{:05},{},PR,18.{:03},-66.{:03}",
            601 + i,
            place,
            100 + i,
            200 + i
        ));
    }
    lines
}

fn small_block_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .block_capacity(80)
        .build()
}

fn setup_loaded_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let mut engine = Engine::open(small_block_config(&temp_dir)).unwrap();
    engine.load(postal_lines()).unwrap();
    (temp_dir, engine)
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("nested").join("data");
    let config = Config::builder().data_dir(&data_dir).build();

    let engine = Engine::open(config).unwrap();

    assert!(data_dir.is_dir());
    assert!(engine.descriptor().is_none());
    assert!(engine.store().is_empty());
    assert_eq!(engine.get("00601").unwrap(), None);
}

#[test]
fn test_engine_open_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .min_fill_ratio(1.5)
        .build();

    assert!(matches!(Engine::open(config), Err(SeqSetError::Config(_))));
}

#[test]
fn test_load_writes_all_files() {
    let (_temp_dir, engine) = setup_loaded_engine();

    assert!(engine.block_path().exists());
    assert!(engine.descriptor_path().exists());
    assert!(engine.links_path().exists());
    assert!(engine.index_path().exists());
    assert_eq!(engine.index_path(), engine.data_dir().join("blocks.idx"));
}

#[test]
fn test_load_reports_blocks() {
    let temp_dir = TempDir::new().unwrap();
    let mut engine = Engine::open(small_block_config(&temp_dir)).unwrap();

    let report = engine.load(postal_lines()).unwrap();

    assert_eq!(report.record_count, 6);
    assert!(report.block_count > 1);
    assert_eq!(engine.store().len(), report.block_count);
    assert_eq!(engine.descriptor().unwrap().record_count, 6);
    assert_eq!(engine.index().len(), 6);
    assert_eq!(engine.verify().unwrap().active, report.block_count);
}

#[test]
fn test_reopen_restores_state() {
    let (temp_dir, engine) = setup_loaded_engine();
    let store = engine.store().clone();
    let descriptor = engine.descriptor().cloned();
    drop(engine);

    let reopened = Engine::open(small_block_config(&temp_dir)).unwrap();

    assert_eq!(reopened.store(), &store);
    assert_eq!(reopened.descriptor().cloned(), descriptor);
    assert_eq!(reopened.get("00603").unwrap().unwrap(), "00603,Aguadilla,PR,18.102,-66.202");
}

#[test]
fn test_open_path_uses_descriptor_layout() {
    let (temp_dir, engine) = setup_loaded_engine();
    drop(engine);

    // Default config, but the descriptor carries the block size
    let reopened = Engine::open_path(temp_dir.path()).unwrap();

    assert_eq!(reopened.descriptor().unwrap().block_size, 80);
    assert!(reopened.get("00606").unwrap().is_some());
}

#[test]
fn test_load_replaces_contents() {
    let (_temp_dir, mut engine) = setup_loaded_engine();

    engine
        .load([HEADER, "99950,Ketchikan,AK,55.542,-131.432"])
        .unwrap();

    assert_eq!(engine.get("00601").unwrap(), None);
    assert!(engine.get("99950").unwrap().is_some());
    assert_eq!(engine.store().len(), 1);
}

#[test]
fn test_load_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("zips.csv");
    fs::write(&input, postal_lines().join("\n")).unwrap();

    let config = Config::builder()
        .data_dir(temp_dir.path().join("data"))
        .build();
    let mut engine = Engine::open(config).unwrap();
    let report = engine.load_file(&input).unwrap();

    assert_eq!(report.record_count, 6);
    assert!(engine.get("00604").unwrap().unwrap().starts_with("00604,Maricao"));
}

#[test]
fn test_load_rejects_wrong_width() {
    let temp_dir = TempDir::new().unwrap();
    let mut engine = Engine::open(small_block_config(&temp_dir)).unwrap();

    let result = engine.load([HEADER, "00601,Adjuntas,PR"]);

    assert!(matches!(result, Err(SeqSetError::Format(_))));
    assert!(!engine.block_path().exists());
}

#[test]
fn test_failed_load_keeps_previous_contents() {
    let (temp_dir, mut engine) = setup_loaded_engine();
    let blocks_before = fs::read(engine.block_path()).unwrap();
    let index_before = fs::read(engine.index_path()).unwrap();

    // The primary key contains a space, which the index cannot store
    let result = engine.load([HEADER, "11111 2,Bad Key,NY,1.0,2.0"]);

    assert!(matches!(result, Err(SeqSetError::Format(_))));
    assert_eq!(fs::read(engine.block_path()).unwrap(), blocks_before);
    assert_eq!(fs::read(engine.index_path()).unwrap(), index_before);
    assert!(!temp_dir.path().join("blocks.dat.tmp").exists());
    assert!(engine.get("00601").unwrap().is_some());
    drop(engine);

    let reopened = Engine::open(small_block_config(&temp_dir)).unwrap();
    assert_eq!(reopened.get("00601").unwrap().unwrap(), "00601,Adjuntas,PR,18.100,-66.200");
    assert_eq!(reopened.get("11111 2").unwrap(), None);
    assert_eq!(reopened.index().len(), 6);
}

#[test]
fn test_load_failing_after_build_commits_nothing() {
    let (temp_dir, mut engine) = setup_loaded_engine();
    let blocks_before = fs::read(engine.block_path()).unwrap();
    let descriptor_before = fs::read(engine.descriptor_path()).unwrap();

    // Staging the index cannot create its temporary file
    fs::create_dir(temp_dir.path().join("blocks.idx.tmp")).unwrap();

    let result = engine.load([HEADER, "99950,Ketchikan,AK,55.542,-131.432"]);

    assert!(matches!(result, Err(SeqSetError::Io(_))));
    assert_eq!(fs::read(engine.block_path()).unwrap(), blocks_before);
    assert_eq!(fs::read(engine.descriptor_path()).unwrap(), descriptor_before);
    assert!(!temp_dir.path().join("blocks.dat.tmp").exists());
    assert!(!temp_dir.path().join("blocks.hdr.tmp").exists());
    assert!(!temp_dir.path().join("blocks.lnk.tmp").exists());
    assert_eq!(engine.get("99950").unwrap(), None);
    drop(engine);

    let reopened = Engine::open(small_block_config(&temp_dir)).unwrap();
    assert!(reopened.get("00606").unwrap().is_some());
    assert_eq!(reopened.get("99950").unwrap(), None);
    assert_eq!(reopened.verify().unwrap().active, reopened.store().len());
}

#[test]
fn test_load_stores_numeric_text_verbatim() {
    let temp_dir = TempDir::new().unwrap();
    let mut engine = Engine::open(small_block_config(&temp_dir)).unwrap();

    engine
        .load([HEADER, "00601,Adjuntas,PR,1.2.3,-66.1"])
        .unwrap();

    assert_eq!(engine.get("00601").unwrap().unwrap(), "00601,Adjuntas,PR,1.2.3,-66.1");
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_get_every_key() {
    let (_temp_dir, engine) = setup_loaded_engine();

    for line in postal_lines().iter().skip(1) {
        let key = line.split(',').next().unwrap();
        assert_eq!(engine.get(key).unwrap().as_deref(), Some(line.as_str()));
    }
}

#[test]
fn test_get_missing_key() {
    let (_temp_dir, engine) = setup_loaded_engine();
    assert_eq!(engine.get("12345").unwrap(), None);
    assert_eq!(engine.get("").unwrap(), None);
}

#[test]
fn test_duplicate_key_returns_first_record() {
    let temp_dir = TempDir::new().unwrap();
    let mut engine = Engine::open(small_block_config(&temp_dir)).unwrap();

    engine
        .load([
            HEADER,
            "00601,Adjuntas,PR,18.1,-66.7",
            "00601,Duplicate,PR,18.2,-66.8",
        ])
        .unwrap();

    assert_eq!(engine.index().entry_count(), 2);
    assert_eq!(
        engine.get("00601").unwrap().unwrap(),
        "00601,Adjuntas,PR,18.1,-66.7"
    );
}

#[test]
fn test_get_with_stale_index_is_consistency_error() {
    let (temp_dir, engine) = setup_loaded_engine();
    let index_path = engine.index_path();
    drop(engine);

    // Point the first key at the last block line
    let contents = fs::read_to_string(&index_path).unwrap();
    let last_offset = contents.lines().last().unwrap().split(' ').nth(1).unwrap().to_string();
    let first = contents.lines().next().unwrap().split(' ').next().unwrap().to_string();
    fs::write(&index_path, format!("{} {}\n", first, last_offset)).unwrap();

    let reopened = Engine::open(small_block_config(&temp_dir)).unwrap();
    let result = reopened.get(&first);
    assert!(matches!(result, Err(SeqSetError::Consistency(_))));
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_missing_index_is_rebuilt() {
    let (temp_dir, engine) = setup_loaded_engine();
    let index_path = engine.index_path();
    let original = fs::read_to_string(&index_path).unwrap();
    drop(engine);

    fs::remove_file(&index_path).unwrap();
    let reopened = Engine::open(small_block_config(&temp_dir)).unwrap();

    assert_eq!(fs::read_to_string(&index_path).unwrap(), original);
    assert!(reopened.get("00605").unwrap().is_some());
}

#[test]
fn test_missing_link_table_falls_back_to_physical_order() {
    let (temp_dir, engine) = setup_loaded_engine();
    let store = engine.store().clone();
    let links_path = engine.links_path();
    drop(engine);

    fs::remove_file(&links_path).unwrap();
    let reopened = Engine::open(small_block_config(&temp_dir)).unwrap();

    assert_eq!(reopened.store(), &store);
    reopened.verify().unwrap();
}

#[test]
fn test_corrupt_link_table_fails_open() {
    let (temp_dir, engine) = setup_loaded_engine();
    let links_path = engine.links_path();
    drop(engine);

    let mut bytes = fs::read(&links_path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&links_path, bytes).unwrap();

    let result = Engine::open(small_block_config(&temp_dir));
    assert!(matches!(result, Err(SeqSetError::Corruption(_))));
}

#[test]
fn test_corrupt_descriptor_fails_open() {
    let (temp_dir, engine) = setup_loaded_engine();
    let descriptor_path = engine.descriptor_path();
    drop(engine);

    fs::write(&descriptor_path, "20blocked_sequence_set,03").unwrap();

    let result = Engine::open(small_block_config(&temp_dir));
    assert!(matches!(result, Err(SeqSetError::Format(_))));
}

#[test]
fn test_custom_index_file_name() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .index_file_name("zips.idx")
        .build();
    let mut engine = Engine::open(config).unwrap();
    engine.load(postal_lines()).unwrap();
    drop(engine);

    assert!(temp_dir.path().join("zips.idx").exists());

    // The descriptor records the name, so a default config still finds it
    let reopened = Engine::open_path(temp_dir.path()).unwrap();
    assert_eq!(reopened.index_path(), temp_dir.path().join("zips.idx"));
    assert_eq!(reopened.index().len(), 6);
}

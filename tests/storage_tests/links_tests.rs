//! Tests for the link table sidecar
//!
//! These tests verify:
//! - Header layout (magic, version, checksum, length)
//! - Encode/decode round trip
//! - Corruption detection

use seqset::storage::{LinkEntry, LinkTable};
use seqset::SeqSetError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_table() -> LinkTable {
    LinkTable {
        list_head: Some(1),
        avail_head: Some(3),
        entries: vec![
            LinkEntry {
                rbn: 1,
                is_available: false,
                predecessor: None,
                successor: Some(2),
            },
            LinkEntry {
                rbn: 2,
                is_available: false,
                predecessor: Some(1),
                successor: None,
            },
            LinkEntry {
                rbn: 3,
                is_available: true,
                predecessor: None,
                successor: None,
            },
        ],
    }
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_header_layout() {
    let bytes = sample_table().encode().unwrap();

    assert_eq!(&bytes[0..4], b"BSQL");
    assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 1);

    let payload_len = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]) as usize;
    assert_eq!(bytes.len(), 14 + payload_len);

    let crc = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    assert_eq!(crc, crc32fast::hash(&bytes[14..]));
}

#[test]
fn test_round_trip() {
    let table = sample_table();
    let decoded = LinkTable::decode(&table.encode().unwrap()).unwrap();
    assert_eq!(decoded, table);
}

#[test]
fn test_round_trip_empty() {
    let table = LinkTable::default();
    assert_eq!(LinkTable::decode(&table.encode().unwrap()).unwrap(), table);
}

#[test]
fn test_save_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("blocks.lnk");

    sample_table().save(&path).unwrap();

    assert_eq!(LinkTable::load(&path).unwrap(), sample_table());
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_truncated_header() {
    let result = LinkTable::decode(b"BSQL");
    assert!(matches!(result, Err(SeqSetError::Corruption(_))));
}

#[test]
fn test_bad_magic() {
    let mut bytes = sample_table().encode().unwrap();
    bytes[0] = b'X';
    assert!(matches!(LinkTable::decode(&bytes), Err(SeqSetError::Corruption(_))));
}

#[test]
fn test_unsupported_version() {
    let mut bytes = sample_table().encode().unwrap();
    bytes[4] = 9;
    assert!(matches!(LinkTable::decode(&bytes), Err(SeqSetError::Corruption(_))));
}

#[test]
fn test_flipped_payload_bit() {
    let mut bytes = sample_table().encode().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    assert!(matches!(LinkTable::decode(&bytes), Err(SeqSetError::Corruption(_))));
}

#[test]
fn test_truncated_payload() {
    let mut bytes = sample_table().encode().unwrap();
    bytes.pop();
    assert!(matches!(LinkTable::decode(&bytes), Err(SeqSetError::Corruption(_))));
}

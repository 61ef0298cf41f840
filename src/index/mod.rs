//! Primary Index Module
//!
//! Maps primary-key values to the byte offset of the line holding them.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────┐
//! │ <key> <offset>\n         │
//! │ ... one line per record  │
//! └──────────────────────────┘
//! ```
//! Entries appear in discovery order. When a key repeats, the first entry
//! wins, both for the linear scan over the file and for the in-memory map.

mod file;

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

pub use file::{
    build_from_block_file, build_from_length_indicated, build_from_store, fetch_by_offset,
    is_indexed_key, lookup, read_entries, write_entries,
};
pub(crate) use file::stage_entries;

/// One (key, byte offset) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: String,
    pub offset: u64,
}

impl IndexEntry {
    pub fn new(key: impl Into<String>, offset: u64) -> Self {
        Self {
            key: key.into(),
            offset,
        }
    }
}

/// In-memory index for O(log n) lookups
#[derive(Debug, Clone, Default)]
pub struct PrimaryIndex {
    /// key → offset of the first entry with that key
    map: BTreeMap<String, u64>,
    /// Entries seen, duplicates included
    entry_count: usize,
}

impl PrimaryIndex {
    /// Build from entries in discovery order
    pub fn from_entries(entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let mut map = BTreeMap::new();
        let mut entry_count = 0;

        for entry in entries {
            entry_count += 1;
            if map.contains_key(&entry.key) {
                tracing::warn!(key = %entry.key, offset = entry.offset, "duplicate key, keeping first entry");
                continue;
            }
            map.insert(entry.key, entry.offset);
        }

        Self { map, entry_count }
    }

    /// Load an index file into memory
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_entries(read_entries(path)?))
    }

    /// Offset of `key`, or `None` if absent
    pub fn lookup(&self, key: &str) -> Option<u64> {
        self.map.get(key).copied()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of entries read, duplicates included
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn min_key(&self) -> Option<&str> {
        self.map.keys().next().map(String::as_str)
    }

    pub fn max_key(&self) -> Option<&str> {
        self.map.keys().next_back().map(String::as_str)
    }

    /// Keys in sorted order with their offsets
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.map.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

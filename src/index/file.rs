//! Index file operations
//!
//! Building entries by scanning a data file, persisting them, linear lookup
//! and offset-based fetch.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Result, SeqSetError};
use crate::record::{LengthIndicatedReader, FIELD_SEPARATOR};
use crate::staged::StagedFile;
use crate::storage::{Block, BlockStore};

use super::IndexEntry;

/// Index the records of a block file.
///
/// Each block line is split into records of `fields_per_record` fields; the
/// key is field `key_field` of each record and the offset is the byte offset
/// of the block line. Keys that do not start with an ASCII digit are skipped.
pub fn build_from_block_file(
    path: &Path,
    fields_per_record: usize,
    key_field: usize,
) -> Result<Vec<IndexEntry>> {
    if key_field >= fields_per_record {
        return Err(SeqSetError::Config(format!(
            "key field {} is outside a record of {} fields",
            key_field, fields_per_record
        )));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    let mut line = String::new();
    let mut offset = 0u64;
    let mut line_no = 0usize;

    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        let line_start = offset;
        offset += read as u64;
        line_no += 1;

        let content = line.trim_end_matches(['\n', '\r']);
        if content.is_empty() {
            continue;
        }

        let (rbn, records) = Block::parse_line(content, line_no, Some(fields_per_record))?;
        for record in &records {
            let key = record.split(FIELD_SEPARATOR).nth(key_field).unwrap_or_default();
            push_if_indexable(&mut entries, key, line_start, || format!("block {}", rbn));
        }
    }

    tracing::info!(entries = entries.len(), path = %path.display(), "indexed block file");
    Ok(entries)
}

/// Index the blocks of an in-memory store.
///
/// Offsets match the file `BlockStore::write_block_file` produces for the
/// same store: one line per block in RBN order.
pub fn build_from_store(store: &BlockStore, key_field: usize) -> Result<Vec<IndexEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0u64;

    for block in store.dump_physical_order() {
        let line_start = offset;
        offset += block.to_line().len() as u64 + 1;

        for record in &block.records {
            let key = record.split(FIELD_SEPARATOR).nth(key_field).unwrap_or_default();
            push_if_indexable(&mut entries, key, line_start, || format!("block {}", block.rbn));
        }
    }

    tracing::info!(entries = entries.len(), blocks = store.len(), "indexed block store");
    Ok(entries)
}

/// Index a length-indicated text file: one entry per line, offset of the line
pub fn build_from_length_indicated(path: &Path, key_field: usize) -> Result<Vec<IndexEntry>> {
    let mut entries = Vec::new();

    for record in LengthIndicatedReader::open(path)? {
        let record = record?;
        let key = record.fields.get(key_field).ok_or_else(|| {
            SeqSetError::Format(format!(
                "record at byte {} has {} fields, key field is {}",
                record.offset,
                record.fields.len(),
                key_field
            ))
        })?;
        push_if_indexable(&mut entries, key, record.offset, || {
            format!("byte {}", record.offset)
        });
    }

    tracing::info!(entries = entries.len(), path = %path.display(), "indexed data file");
    Ok(entries)
}

/// Keys that start with an ASCII digit get an index entry
pub fn is_indexed_key(key: &str) -> bool {
    key.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

fn push_if_indexable(
    entries: &mut Vec<IndexEntry>,
    key: &str,
    offset: u64,
    location: impl FnOnce() -> String,
) {
    if is_indexed_key(key) {
        entries.push(IndexEntry::new(key, offset));
    } else {
        tracing::debug!(key, at = %location(), "skipping non-numeric key");
    }
}

/// Write entries as `<key> <offset>` lines
pub fn write_entries(path: &Path, entries: &[IndexEntry]) -> Result<()> {
    stage_entries(path, entries)?.commit()
}

/// Write entries to a staged file without committing it
pub(crate) fn stage_entries(path: &Path, entries: &[IndexEntry]) -> Result<StagedFile> {
    let mut file = StagedFile::create(path)?;
    for entry in entries {
        if entry.key.is_empty() || entry.key.contains(char::is_whitespace) {
            return Err(SeqSetError::Format(format!(
                "index key {:?} cannot be stored in a whitespace-delimited index",
                entry.key
            )));
        }
        writeln!(file, "{} {}", entry.key, entry.offset)?;
    }
    Ok(file)
}

/// Read every entry of an index file, in file order
pub fn read_entries(path: &Path) -> Result<Vec<IndexEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        if let Some(entry) = parse_index_line(&line?, i + 1)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Linear scan of an index file for the first exact match.
///
/// Returns `Ok(None)` when the key is absent.
pub fn lookup(path: &Path, key: &str) -> Result<Option<u64>> {
    let reader = BufReader::new(File::open(path)?);
    for (i, line) in reader.lines().enumerate() {
        if let Some(entry) = parse_index_line(&line?, i + 1)? {
            if entry.key == key {
                return Ok(Some(entry.offset));
            }
        }
    }
    Ok(None)
}

fn parse_index_line(line: &str, line_no: usize) -> Result<Option<IndexEntry>> {
    let mut tokens = line.split_whitespace();
    let (key, offset) = match (tokens.next(), tokens.next(), tokens.next()) {
        (None, _, _) => return Ok(None),
        (Some(key), Some(offset), None) => (key, offset),
        _ => {
            return Err(SeqSetError::Format(format!(
                "index line {}: expected \"<key> <offset>\", got {:?}",
                line_no, line
            )));
        }
    };

    let offset = offset.parse::<u64>().map_err(|_| {
        SeqSetError::Format(format!(
            "index line {}: offset {:?} is not a number",
            line_no, offset
        ))
    })?;

    Ok(Some(IndexEntry::new(key, offset)))
}

/// Read the line starting at byte `offset` (without its terminator)
pub fn fetch_by_offset(path: &Path, offset: u64) -> Result<String> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if offset >= len {
        return Err(SeqSetError::OffsetOutOfRange { offset, len });
    }

    file.seek(SeekFrom::Start(offset))?;
    let mut reader = BufReader::new(file.take(len - offset));
    let mut line = String::new();
    reader.read_line(&mut line)?;

    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

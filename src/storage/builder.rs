//! Block File Builder
//!
//! Packs an ordered record stream into fixed-capacity blocks and writes the
//! block file.

use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::descriptor::min_fill_bytes;
use crate::error::{Result, SeqSetError};
use crate::index::is_indexed_key;
use crate::record::FIELD_SEPARATOR;
use crate::staged::StagedFile;

use super::block::Block;
use super::Rbn;

/// First RBN handed out by a fresh build
pub const FIRST_RBN: Rbn = 1;

/// Summary of a finished build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Number of blocks written
    pub block_count: usize,
    /// Number of records written
    pub record_count: u64,
    /// Blocks holding a single record larger than the capacity
    pub oversized_blocks: Vec<Rbn>,
    /// Sealed blocks (other than the last) below the advisory minimum fill
    pub underfull_blocks: Vec<Rbn>,
    /// Size of the block file
    pub bytes_written: u64,
}

/// Blocks produced by a build, in RBN order, chained 1 → 2 → … → n
#[derive(Debug)]
pub struct BuildOutput {
    pub blocks: Vec<Block>,
    pub report: BuildReport,
}

/// Builder for a block file.
///
/// Call `add()` in key order, then `finish()` to seal the final block and
/// commit the file.
pub struct BlockFileBuilder {
    /// Staged output (renamed into place on finish)
    file: StagedFile,
    /// Maximum accounted bytes per block
    capacity: usize,
    /// Fields every record must carry
    fields_per_record: usize,
    /// Ordinal of the primary key field
    key_field: usize,
    /// Advisory lower bound on a sealed block's payload
    min_block_bytes: usize,
    /// RBN the next sealed block receives
    next_rbn: Rbn,
    /// Records of the block being filled
    current: Vec<String>,
    /// Accounted size of `current` (each record counts len + 1)
    current_bytes: usize,
    /// The current block holds a single over-capacity record
    current_oversized: bool,
    /// Sealed blocks
    blocks: Vec<Block>,
    report: BuildReport,
}

impl BlockFileBuilder {
    /// Create a builder writing to `path`
    pub fn new(path: &Path, config: &Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            file: StagedFile::create(path)?,
            capacity: config.block_capacity,
            fields_per_record: config.fields_per_record(),
            key_field: config.primary_key_field,
            min_block_bytes: min_fill_bytes(config.block_capacity, config.min_fill_ratio),
            next_rbn: FIRST_RBN,
            current: Vec::new(),
            current_bytes: 0,
            current_oversized: false,
            blocks: Vec::new(),
            report: BuildReport::default(),
        })
    }

    /// Add the next record (must be called in key order)
    pub fn add(&mut self, record: &str) -> Result<()> {
        self.check_record(record)?;

        // Accounted size includes one byte for the separator/terminator
        let record_bytes = record.len() + 1;

        if !self.current.is_empty() && self.current_bytes + record_bytes > self.capacity {
            self.seal_current()?;
        }

        if self.current.is_empty() && record_bytes > self.capacity {
            tracing::warn!(
                rbn = self.next_rbn,
                bytes = record.len(),
                capacity = self.capacity,
                "record exceeds block capacity, storing it alone"
            );
            self.current_oversized = true;
        }

        self.current.push(record.to_string());
        self.current_bytes += record_bytes;
        self.report.record_count += 1;

        Ok(())
    }

    /// Seal the final block, commit the file and return the built blocks
    pub fn finish(self) -> Result<BuildOutput> {
        let (output, file) = self.finish_staged()?;
        file.commit()?;
        Ok(output)
    }

    /// Seal the final block but leave the file uncommitted
    pub(crate) fn finish_staged(mut self) -> Result<(BuildOutput, StagedFile)> {
        if !self.current.is_empty() {
            self.seal_current()?;
        }

        // The last block is allowed to be underfull
        if let Some((_, sealed)) = self.blocks.split_last() {
            for block in sealed {
                if block.payload_size() < self.min_block_bytes {
                    tracing::warn!(
                        rbn = block.rbn,
                        bytes = block.payload_size(),
                        minimum = self.min_block_bytes,
                        "block below minimum fill"
                    );
                    self.report.underfull_blocks.push(block.rbn);
                }
            }
        }

        self.report.block_count = self.blocks.len();

        let output = BuildOutput {
            blocks: self.blocks,
            report: self.report,
        };
        Ok((output, self.file))
    }

    /// Number of records added so far
    pub fn record_count(&self) -> u64 {
        self.report.record_count
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_record(&self, record: &str) -> Result<()> {
        if record.contains(['\n', '\r']) {
            return Err(SeqSetError::Format(format!(
                "record {} contains a line break",
                self.report.record_count + 1
            )));
        }

        let width = record.split(FIELD_SEPARATOR).count();
        if width != self.fields_per_record {
            return Err(SeqSetError::Format(format!(
                "record {} has {} fields, schema declares {}",
                self.report.record_count + 1,
                width,
                self.fields_per_record
            )));
        }

        // The index stores `<key> <offset>` lines, so an indexed key cannot
        // contain whitespace
        let key = record.split(FIELD_SEPARATOR).nth(self.key_field).unwrap_or_default();
        if is_indexed_key(key) && key.contains(char::is_whitespace) {
            return Err(SeqSetError::Format(format!(
                "record {} has primary key {:?}, which contains whitespace",
                self.report.record_count + 1,
                key
            )));
        }
        Ok(())
    }

    /// Write `current` as the next block and link it after the previous one
    fn seal_current(&mut self) -> Result<()> {
        let rbn = self.next_rbn;
        self.next_rbn = rbn.checked_add(1).ok_or_else(|| {
            SeqSetError::Consistency("RBN space exhausted".to_string())
        })?;

        let records = std::mem::take(&mut self.current);
        let mut block = Block::new(rbn, records);

        let line = block.to_line();
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.report.bytes_written += line.len() as u64 + 1;

        if let Some(prev) = self.blocks.last_mut() {
            prev.successor = Some(rbn);
            block.predecessor = Some(prev.rbn);
        }

        if self.current_oversized {
            self.report.oversized_blocks.push(rbn);
        }

        tracing::debug!(
            rbn,
            records = block.records.len(),
            bytes = block.payload_size(),
            "sealed block"
        );

        self.blocks.push(block);
        self.current_bytes = 0;
        self.current_oversized = false;
        Ok(())
    }
}

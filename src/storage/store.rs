//! Block Store
//!
//! Owns the RBN → Block table and the heads of the active and available
//! lists. There is no ambient state: every operation goes through a
//! `BlockStore` value.
//!
//! ## Responsibilities
//! - Build a block file from an ordered record stream
//! - Parse a block file back into blocks
//! - Reuse freed blocks through the available list
//! - Persist and restore linkage through the link table

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::config::Config;
use crate::descriptor::Descriptor;
use crate::error::{Result, SeqSetError};
use crate::staged::StagedFile;

use super::block::Block;
use super::builder::{BlockFileBuilder, BuildReport, FIRST_RBN};
use super::links::{LinkEntry, LinkTable};
use super::Rbn;

/// A finished build whose block file has not been renamed into place
pub(crate) struct StagedBuild {
    pub(crate) store: BlockStore,
    pub(crate) descriptor: Descriptor,
    pub(crate) report: BuildReport,
    pub(crate) block_file: StagedFile,
}

impl StagedBuild {
    /// Commit the block file and hand back the built state
    pub(crate) fn commit(self) -> Result<(BlockStore, Descriptor, BuildReport)> {
        self.block_file.commit()?;
        Ok((self.store, self.descriptor, self.report))
    }
}

/// Blocks keyed by RBN plus the two list heads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockStore {
    /// Arena of blocks, ordered by RBN (physical order)
    pub(super) blocks: BTreeMap<Rbn, Block>,
    /// First block of the active list
    pub(super) list_head: Option<Rbn>,
    /// First block of the available list
    pub(super) avail_head: Option<Rbn>,
}

impl BlockStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Build / Parse
    // =========================================================================

    /// Build a block file at `block_path` from ordered input lines.
    ///
    /// Skips the first line when `config.skip_header` is set and blank lines
    /// (with a warning). Returns the in-memory store, the matching
    /// descriptor and a build report.
    pub fn build<I, S>(
        config: &Config,
        lines: I,
        block_path: &Path,
    ) -> Result<(Self, Descriptor, BuildReport)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::stage_build(config, lines, block_path)?.commit()
    }

    /// Build a block file from the lines of `input`
    pub fn build_from_file(
        config: &Config,
        input: &Path,
        block_path: &Path,
    ) -> Result<(Self, Descriptor, BuildReport)> {
        Self::stage_build_from_file(config, input, block_path)?.commit()
    }

    /// Like `build`, but the block file stays staged until committed
    pub(crate) fn stage_build<I, S>(
        config: &Config,
        lines: I,
        block_path: &Path,
    ) -> Result<StagedBuild>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::stage_lines(config, lines.into_iter().map(Ok), block_path)
    }

    /// Like `build_from_file`, but the block file stays staged
    pub(crate) fn stage_build_from_file(
        config: &Config,
        input: &Path,
        block_path: &Path,
    ) -> Result<StagedBuild> {
        let reader = BufReader::new(File::open(input)?);
        Self::stage_lines(
            config,
            reader.lines().map(|line| line.map_err(SeqSetError::from)),
            block_path,
        )
    }

    fn stage_lines<I, S>(config: &Config, lines: I, block_path: &Path) -> Result<StagedBuild>
    where
        I: Iterator<Item = Result<S>>,
        S: AsRef<str>,
    {
        let mut builder = BlockFileBuilder::new(block_path, config)?;

        for (line_no, line) in lines.enumerate() {
            let line = line?;
            if config.skip_header && line_no == 0 {
                continue;
            }
            let record = line.as_ref().trim_end_matches('\r');
            if record.is_empty() {
                tracing::warn!(line = line_no + 1, "skipping blank input line");
                continue;
            }
            builder.add(record)?;
        }

        let (output, block_file) = builder.finish_staged()?;

        let mut store = Self::new();
        for block in output.blocks {
            store.create_block(
                block.rbn,
                false,
                block.records,
                block.predecessor,
                block.successor,
            );
        }

        let descriptor = Descriptor::from_config(config, output.report.record_count);

        tracing::info!(
            blocks = output.report.block_count,
            records = output.report.record_count,
            oversized = output.report.oversized_blocks.len(),
            underfull = output.report.underfull_blocks.len(),
            path = %block_path.display(),
            "built block file"
        );

        Ok(StagedBuild {
            store,
            descriptor,
            report: output.report,
            block_file,
        })
    }

    /// Parse a block file. Blocks come back active and unlinked.
    pub fn parse(path: &Path, fields_per_record: Option<usize>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Self::parse_reader(reader, fields_per_record)
    }

    /// Parse block lines from any reader
    pub fn parse_reader<R: BufRead>(reader: R, fields_per_record: Option<usize>) -> Result<Self> {
        let mut store = Self::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (rbn, records) = Block::parse_line(line, i + 1, fields_per_record)?;
            store.create_block(rbn, false, records, None, None);
        }
        Ok(store)
    }

    // =========================================================================
    // Block Table
    // =========================================================================

    /// Insert or overwrite the block keyed by `rbn` (last write wins).
    ///
    /// The first active block inserted becomes the list head and the first
    /// available block becomes the available head.
    pub fn create_block(
        &mut self,
        rbn: Rbn,
        is_available: bool,
        records: Vec<String>,
        predecessor: Option<Rbn>,
        successor: Option<Rbn>,
    ) {
        self.blocks.insert(
            rbn,
            Block {
                rbn,
                is_available,
                records,
                predecessor,
                successor,
            },
        );

        if !is_available && self.list_head.is_none() {
            self.list_head = Some(rbn);
        }
        if is_available && self.avail_head.is_none() {
            self.avail_head = Some(rbn);
        }
    }

    /// Chain every active block in ascending RBN order (and every available
    /// block likewise), resetting both heads.
    ///
    /// A freshly built block file is in this order, so this restores linkage
    /// when no link table is at hand.
    pub fn link_physical_order(&mut self) {
        let active: Vec<Rbn> = self
            .blocks
            .values()
            .filter(|b| !b.is_available)
            .map(|b| b.rbn)
            .collect();
        let available: Vec<Rbn> = self
            .blocks
            .values()
            .filter(|b| b.is_available)
            .map(|b| b.rbn)
            .collect();

        self.list_head = self.chain(&active);
        self.avail_head = self.chain(&available);
    }

    fn chain(&mut self, order: &[Rbn]) -> Option<Rbn> {
        for (i, rbn) in order.iter().enumerate() {
            if let Some(block) = self.blocks.get_mut(rbn) {
                block.predecessor = i.checked_sub(1).map(|p| order[p]);
                block.successor = order.get(i + 1).copied();
            }
        }
        order.first().copied()
    }

    pub fn get(&self, rbn: Rbn) -> Option<&Block> {
        self.blocks.get(&rbn)
    }

    /// Total number of blocks (active and available)
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn list_head(&self) -> Option<Rbn> {
        self.list_head
    }

    pub fn avail_head(&self) -> Option<Rbn> {
        self.avail_head
    }

    pub fn active_count(&self) -> usize {
        self.blocks.values().filter(|b| !b.is_available).count()
    }

    pub fn available_count(&self) -> usize {
        self.blocks.values().filter(|b| b.is_available).count()
    }

    /// Highest RBN in the table
    pub fn max_rbn(&self) -> Option<Rbn> {
        self.blocks.keys().next_back().copied()
    }

    /// Total records across active blocks
    pub fn record_count(&self) -> usize {
        self.blocks
            .values()
            .filter(|b| !b.is_available)
            .map(|b| b.records.len())
            .sum()
    }

    // =========================================================================
    // Free-List Reuse
    // =========================================================================

    /// Place `records` in a new block at the tail of the active list.
    ///
    /// The RBN comes from the head of the available list when one exists,
    /// otherwise it is one past the highest RBN in the table.
    pub fn allocate(&mut self, records: Vec<String>) -> Result<Rbn> {
        let tail = self.active_tail()?;

        // Resolve everything before the first write
        let (rbn, next_avail) = match self.avail_head {
            Some(head) => {
                let block = self.available_block(head, "available head")?;
                if let Some(next) = block.successor {
                    self.available_block(next, "available successor")?;
                }
                (head, block.successor)
            }
            None => {
                let rbn = match self.max_rbn() {
                    Some(max) => max.checked_add(1).ok_or_else(|| {
                        SeqSetError::Consistency("RBN space exhausted".to_string())
                    })?,
                    None => FIRST_RBN,
                };
                (rbn, None)
            }
        };

        if self.avail_head.is_some() {
            self.avail_head = next_avail;
            if let Some(next) = next_avail {
                self.block_mut(next)?.predecessor = None;
            }
            tracing::debug!(rbn, "reusing available block");
        }

        self.blocks.insert(
            rbn,
            Block {
                rbn,
                is_available: false,
                records,
                predecessor: tail,
                successor: None,
            },
        );

        match tail {
            Some(tail) => self.block_mut(tail)?.successor = Some(rbn),
            None => self.list_head = Some(rbn),
        }

        Ok(rbn)
    }

    /// Unlink an active block, clear it and push it on the available list
    pub fn free(&mut self, rbn: Rbn) -> Result<()> {
        let block = self
            .blocks
            .get(&rbn)
            .ok_or_else(|| SeqSetError::Consistency(format!("no block {}", rbn)))?;
        if block.is_available {
            return Err(SeqSetError::Consistency(format!(
                "block {} is already on the available list",
                rbn
            )));
        }
        let (predecessor, successor) = (block.predecessor, block.successor);

        // Every neighbour must exist before anything is relinked
        for (what, neighbour) in [
            ("predecessor", predecessor),
            ("successor", successor),
            ("available head", self.avail_head),
        ] {
            if let Some(n) = neighbour {
                if !self.blocks.contains_key(&n) {
                    return Err(dangling(what, n));
                }
            }
        }

        match predecessor {
            Some(p) => self.block_mut(p)?.successor = successor,
            None => self.list_head = successor,
        }
        if let Some(s) = successor {
            self.block_mut(s)?.predecessor = predecessor;
        }

        let old_avail = self.avail_head;
        if let Some(head) = old_avail {
            self.block_mut(head)?.predecessor = Some(rbn);
        }

        let block = self.block_mut(rbn)?;
        block.records.clear();
        block.is_available = true;
        block.predecessor = None;
        block.successor = old_avail;
        self.avail_head = Some(rbn);

        tracing::debug!(rbn, "freed block");
        Ok(())
    }

    /// Last block of the active list (bounded walk)
    fn active_tail(&self) -> Result<Option<Rbn>> {
        let mut tail = None;
        for block in self.dump_logical_order() {
            tail = Some(block?.rbn);
        }
        Ok(tail)
    }

    /// A block on the available list, or a consistency error
    fn available_block(&self, rbn: Rbn, what: &str) -> Result<&Block> {
        let block = self.blocks.get(&rbn).ok_or_else(|| dangling(what, rbn))?;
        if !block.is_available {
            return Err(SeqSetError::Consistency(format!(
                "{} {} is not an available block",
                what, rbn
            )));
        }
        Ok(block)
    }

    fn block_mut(&mut self, rbn: Rbn) -> Result<&mut Block> {
        self.blocks
            .get_mut(&rbn)
            .ok_or_else(|| dangling("link", rbn))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Rewrite the block file in physical order; returns bytes written
    pub fn write_block_file(&self, path: &Path) -> Result<u64> {
        let mut file = StagedFile::create(path)?;
        let mut written = 0u64;
        for block in self.dump_physical_order() {
            let line = block.to_line();
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
            written += line.len() as u64 + 1;
        }
        file.commit()?;
        Ok(written)
    }

    /// Snapshot the linkage of every block
    pub fn link_table(&self) -> LinkTable {
        LinkTable {
            list_head: self.list_head,
            avail_head: self.avail_head,
            entries: self
                .blocks
                .values()
                .map(|b| LinkEntry {
                    rbn: b.rbn,
                    is_available: b.is_available,
                    predecessor: b.predecessor,
                    successor: b.successor,
                })
                .collect(),
        }
    }

    /// Apply a link table to parsed blocks.
    ///
    /// Every block must have exactly one entry, every entry must name a
    /// block that exists, and every link and head must point at one. The
    /// table is checked in full before any block is touched.
    pub fn apply_links(&mut self, table: &LinkTable) -> Result<()> {
        if table.entries.len() != self.blocks.len() {
            return Err(SeqSetError::Consistency(format!(
                "link table has {} entries for {} blocks",
                table.entries.len(),
                self.blocks.len()
            )));
        }

        let mut seen = BTreeSet::new();
        for entry in &table.entries {
            if !seen.insert(entry.rbn) {
                return Err(SeqSetError::Consistency(format!(
                    "link table lists block {} twice",
                    entry.rbn
                )));
            }
            if !self.blocks.contains_key(&entry.rbn) {
                return Err(SeqSetError::Consistency(format!(
                    "link table names block {} which is not in the block file",
                    entry.rbn
                )));
            }
        }

        let targets = table
            .entries
            .iter()
            .flat_map(|e| [("predecessor", e.predecessor), ("successor", e.successor)])
            .chain([("list head", table.list_head), ("available head", table.avail_head)]);
        for (what, target) in targets {
            if let Some(rbn) = target {
                if !self.blocks.contains_key(&rbn) {
                    return Err(dangling(what, rbn));
                }
            }
        }

        for entry in &table.entries {
            if let Some(block) = self.blocks.get_mut(&entry.rbn) {
                block.is_available = entry.is_available;
                block.predecessor = entry.predecessor;
                block.successor = entry.successor;
            }
        }

        self.list_head = table.list_head;
        self.avail_head = table.avail_head;
        Ok(())
    }
}

pub(super) fn dangling(what: &str, rbn: Rbn) -> SeqSetError {
    SeqSetError::Consistency(format!("{} points at missing block {}", what, rbn))
}

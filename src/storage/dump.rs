//! Diagnostics
//!
//! Physical and logical traversal of a `BlockStore`, dumps, and a chain
//! consistency check. Every chain walk is bounded by the block count, so a
//! cycle surfaces as a `Consistency` error instead of an endless loop.

use std::collections::{btree_map, BTreeSet};
use std::io::Write;

use crate::error::{Result, SeqSetError};

use super::block::Block;
use super::store::{dangling, BlockStore};
use super::Rbn;

/// Blocks in ascending RBN order
pub struct PhysicalOrder<'a> {
    inner: btree_map::Values<'a, Rbn, Block>,
}

impl<'a> Iterator for PhysicalOrder<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Which linked list a chain walk follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Active,
    Available,
}

impl ChainKind {
    fn name(&self) -> &'static str {
        match self {
            ChainKind::Active => "active",
            ChainKind::Available => "available",
        }
    }

    fn admits(&self, block: &Block) -> bool {
        match self {
            ChainKind::Active => !block.is_available,
            ChainKind::Available => block.is_available,
        }
    }
}

/// Blocks in list order, following successor links from a head
pub struct ChainIter<'a> {
    store: &'a BlockStore,
    kind: ChainKind,
    next: Option<Rbn>,
    steps: usize,
    limit: usize,
    failed: bool,
}

impl<'a> ChainIter<'a> {
    fn fail(&mut self, error: SeqSetError) -> Option<Result<&'a Block>> {
        self.failed = true;
        Some(Err(error))
    }
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = Result<&'a Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let rbn = self.next?;

        if self.steps >= self.limit {
            return self.fail(SeqSetError::Consistency(format!(
                "{} chain longer than {} blocks (cycle at block {})",
                self.kind.name(),
                self.limit,
                rbn
            )));
        }

        let Some(block) = self.store.blocks.get(&rbn) else {
            return self.fail(dangling(self.kind.name(), rbn));
        };

        if !self.kind.admits(block) {
            return self.fail(SeqSetError::Consistency(format!(
                "{} chain reaches block {} which is on the other list",
                self.kind.name(),
                rbn
            )));
        }

        self.steps += 1;
        self.next = block.successor;
        Some(Ok(block))
    }
}

/// Lengths of both chains after a successful `verify()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainStats {
    pub active: usize,
    pub available: usize,
}

impl BlockStore {
    /// Blocks ordered by RBN. Restartable; does not touch the store.
    pub fn dump_physical_order(&self) -> PhysicalOrder<'_> {
        PhysicalOrder {
            inner: self.blocks.values(),
        }
    }

    /// Active blocks from the list head following successor links
    pub fn dump_logical_order(&self) -> ChainIter<'_> {
        self.chain_iter(ChainKind::Active, self.list_head)
    }

    /// Available blocks from the available head
    pub fn dump_available_order(&self) -> ChainIter<'_> {
        self.chain_iter(ChainKind::Available, self.avail_head)
    }

    fn chain_iter(&self, kind: ChainKind, head: Option<Rbn>) -> ChainIter<'_> {
        ChainIter {
            store: self,
            kind,
            next: head,
            steps: 0,
            limit: self.blocks.len(),
            failed: false,
        }
    }

    /// Write `RBN: <n> <record> ...` lines in physical order
    pub fn write_physical_dump<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "Dumping Blocks by Physical Order:")?;
        for block in self.dump_physical_order() {
            write_block(out, block)?;
        }
        Ok(())
    }

    /// Write `RBN: <n> <record> ...` lines in logical order
    pub fn write_logical_dump<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "Dumping Blocks by Logical Order:")?;
        for block in self.dump_logical_order() {
            write_block(out, block?)?;
        }
        Ok(())
    }

    /// Write the available list
    pub fn write_available_dump<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "Dumping Available Blocks:")?;
        for block in self.dump_available_order() {
            write_block(out, block?)?;
        }
        Ok(())
    }

    /// Check both chains.
    ///
    /// - every active block is on the active chain exactly once
    /// - every available block is on the available chain exactly once
    /// - predecessor links mirror successor links
    pub fn verify(&self) -> Result<ChainStats> {
        let active = self.verify_chain(ChainKind::Active, self.list_head, self.active_count())?;
        let available =
            self.verify_chain(ChainKind::Available, self.avail_head, self.available_count())?;
        Ok(ChainStats { active, available })
    }

    fn verify_chain(&self, kind: ChainKind, head: Option<Rbn>, expected: usize) -> Result<usize> {
        let mut seen = BTreeSet::new();
        let mut previous: Option<Rbn> = None;

        for block in self.chain_iter(kind, head) {
            let block = block?;
            if !seen.insert(block.rbn) {
                return Err(SeqSetError::Consistency(format!(
                    "{} chain visits block {} twice",
                    kind.name(),
                    block.rbn
                )));
            }
            if block.predecessor != previous {
                return Err(SeqSetError::Consistency(format!(
                    "block {} has predecessor {:?}, chain order says {:?}",
                    block.rbn, block.predecessor, previous
                )));
            }
            previous = Some(block.rbn);
        }

        if seen.len() != expected {
            return Err(SeqSetError::Consistency(format!(
                "{} chain reaches {} of {} {} blocks",
                kind.name(),
                seen.len(),
                expected,
                kind.name()
            )));
        }

        Ok(seen.len())
    }
}

fn write_block<W: Write>(out: &mut W, block: &Block) -> Result<()> {
    write!(out, "RBN: {} ", block.rbn)?;
    for record in &block.records {
        write!(out, "{} ", record)?;
    }
    writeln!(out)?;
    Ok(())
}

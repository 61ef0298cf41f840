//! Storage Module
//!
//! Blocked sequence set: fixed-capacity blocks chained into an active list
//! (logical key order) and an available list (free blocks for reuse).
//!
//! ## Responsibilities
//! - Pack an ordered record stream into blocks
//! - Parse the block file back into blocks
//! - Maintain active/available chains and reuse freed RBNs
//! - Traverse and verify both chains
//!
//! ## Block File Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ 1:<record>,<record>,...\n                    │
//! │ 2:<record>,<record>,...\n                    │
//! │ ... one line per block, ascending RBN        │
//! └──────────────────────────────────────────────┘
//! ```
//! Linkage is kept in a separate link table (see `links`).

mod block;
mod builder;
mod dump;
mod links;
mod store;

pub use block::{payload_size, Block, RBN_SEPARATOR};
pub use builder::{BlockFileBuilder, BuildOutput, BuildReport, FIRST_RBN};
pub use dump::{ChainIter, ChainKind, ChainStats, PhysicalOrder};
pub use links::{LinkEntry, LinkTable};
pub use store::BlockStore;
pub(crate) use store::StagedBuild;

/// Relative block number
pub type Rbn = u32;

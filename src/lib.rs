//! # seqset
//!
//! A blocked sequence set storage engine with:
//! - Length-indicated record codec (text fields and binary payloads)
//! - Fixed-capacity blocks chained into active and available lists
//! - Free-list reuse of released blocks
//! - A flat primary key index with direct offset fetch
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Ordered records (lines)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────┐
//!          │            │                 │
//!          ▼            ▼                 ▼
//!   ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//!   │ Block Store │ │ Descriptor  │ │   Primary   │
//!   │ (blocks.dat)│ │ (blocks.hdr)│ │    Index    │
//!   └──────┬──────┘ └──────┬──────┘ └──────┬──────┘
//!          │               │               │
//!          └───────────────┼───────────────┘
//!                          ▼
//!                  ┌──────────────┐
//!                  │ Record Codec │
//!                  └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod descriptor;
pub mod storage;
pub mod index;
pub mod engine;

mod staged;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SeqSetError, Result};
pub use config::Config;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of seqset
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

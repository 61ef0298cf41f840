//! Link Table
//!
//! The block file records only RBNs and records; the active/available
//! linkage lives in this sidecar.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                            │
//! │   Magic: "BSQL" (4) | Version: u16 (2) | CRC32: u32 (4)      │
//! │   PayloadLen: u32 (4)                                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (bincode)                                            │
//! │   list_head, avail_head, [rbn, is_available, pred, succ]...  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeqSetError};
use crate::staged::StagedFile;

use super::Rbn;

/// Magic bytes identifying a link table file
pub(crate) const MAGIC: &[u8; 4] = b"BSQL";

/// Current link table format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + CRC (4) + PayloadLen (4) = 14 bytes
pub(crate) const HEADER_SIZE: usize = 14;

/// Linkage of one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub rbn: Rbn,
    pub is_available: bool,
    pub predecessor: Option<Rbn>,
    pub successor: Option<Rbn>,
}

/// Linkage of every block plus both list heads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTable {
    pub list_head: Option<Rbn>,
    pub avail_head: Option<Rbn>,
    pub entries: Vec<LinkEntry>,
}

impl LinkTable {
    /// Encode header + payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let payload_len = u32::try_from(payload.len()).map_err(|_| {
            SeqSetError::Serialization(format!("link table too large: {} bytes", payload.len()))
        })?;

        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        out.extend_from_slice(&payload_len.to_le_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Decode and verify header + payload
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(SeqSetError::Corruption(format!(
                "link table truncated: {} bytes, header needs {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(SeqSetError::Corruption(format!(
                "invalid link table magic: expected BSQL, got {:?}",
                &bytes[0..4]
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(SeqSetError::Corruption(format!(
                "unsupported link table version: {}",
                version
            )));
        }

        let expected_crc = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let payload_len = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]) as usize;

        let payload = &bytes[HEADER_SIZE..];
        if payload.len() != payload_len {
            return Err(SeqSetError::Corruption(format!(
                "link table payload is {} bytes, header declares {}",
                payload.len(),
                payload_len
            )));
        }

        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(SeqSetError::Corruption(format!(
                "link table checksum mismatch: expected {:08x}, got {:08x}",
                expected_crc, actual_crc
            )));
        }

        Ok(bincode::deserialize(payload)?)
    }

    /// Persist to `path` (staged, renamed into place)
    pub fn save(&self, path: &Path) -> Result<()> {
        self.stage(path)?.commit()
    }

    /// Write to a staged file without committing it
    pub(crate) fn stage(&self, path: &Path) -> Result<StagedFile> {
        let bytes = self.encode()?;
        let mut file = StagedFile::create(path)?;
        file.write_all(&bytes)?;
        Ok(file)
    }

    /// Load from `path`
    pub fn load(path: &Path) -> Result<Self> {
        Self::decode(&fs::read(path)?)
    }
}

//! Opaque (binary length-prefixed) records
//!
//! ```text
//! ┌──────────────────────┬──────────────────────┐
//! │ Length: u64 (native) │ Payload (Length)     │
//! └──────────────────────┴──────────────────────┘
//! ```
//! No separator, no line terminator; records repeat to end-of-stream.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SeqSetError};
use crate::staged::StagedFile;

/// Width of the native-endian length prefix
pub const LENGTH_PREFIX_SIZE: usize = std::mem::size_of::<u64>();

/// Largest payload accepted when decoding (16 MB)
pub const MAX_OPAQUE_RECORD_SIZE: u64 = 16 * 1024 * 1024;

/// Frame a payload: native-endian length prefix followed by the bytes
pub fn encode_opaque_record(payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.put_u64_ne(payload.len() as u64);
    frame.put_slice(payload);
    frame.freeze()
}

/// Read one framed record.
///
/// Returns:
/// - `Ok(Some(payload))`: a complete record
/// - `Ok(None)`: end-of-stream reached while reading the prefix
/// - `Err(Format)`: the payload is shorter than its prefix claims
pub fn decode_opaque_record<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    let filled = read_until_eof(reader, &mut prefix)?;

    if filled < LENGTH_PREFIX_SIZE {
        if filled > 0 {
            tracing::warn!(bytes = filled, "ignoring trailing partial length prefix");
        }
        return Ok(None);
    }

    let len = u64::from_ne_bytes(prefix);
    if len > MAX_OPAQUE_RECORD_SIZE {
        return Err(SeqSetError::Format(format!(
            "opaque record length {} exceeds maximum {}",
            len, MAX_OPAQUE_RECORD_SIZE
        )));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            SeqSetError::Format(format!("opaque record truncated: expected {} bytes", len))
        } else {
            SeqSetError::Io(e)
        }
    })?;

    Ok(Some(payload))
}

/// Fill as much of `buf` as the stream allows, returning the byte count
fn read_until_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// =============================================================================
// File Writer / Reader
// =============================================================================

/// Writes a length-indicated binary file
pub struct OpaqueWriter {
    file: StagedFile,
    record_count: u64,
}

impl OpaqueWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            file: StagedFile::create(path)?,
            record_count: 0,
        })
    }

    /// Append one record
    pub fn append(&mut self, payload: &[u8]) -> Result<()> {
        self.file.write_all(&encode_opaque_record(payload))?;
        self.record_count += 1;
        Ok(())
    }

    /// Commit the file; returns the number of records written
    pub fn finish(self) -> Result<u64> {
        self.file.commit()?;
        Ok(self.record_count)
    }
}

/// Reads a length-indicated binary file record by record
pub struct OpaqueReader {
    reader: BufReader<File>,
    done: bool,
}

impl OpaqueReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            done: false,
        })
    }

    /// Read the next record (`None` at end-of-stream)
    pub fn next_record(&mut self) -> Result<Option<Vec<u8>>> {
        decode_opaque_record(&mut self.reader)
    }
}

impl Iterator for OpaqueReader {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(payload)) => Some(Ok(payload)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

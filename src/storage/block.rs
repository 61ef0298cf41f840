//! Block definition
//!
//! A block is one line of the block file: `<RBN>:<record>,<record>,...`

use crate::error::{Result, SeqSetError};
use crate::record::FIELD_SEPARATOR;

use super::Rbn;

/// Separates the RBN from the record list on a block line
pub const RBN_SEPARATOR: char = ':';

/// One fixed-capacity block of the sequence set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Relative block number, stable for the block's lifetime
    pub rbn: Rbn,
    /// On the available (free) list rather than the active list
    pub is_available: bool,
    /// Records in key order
    pub records: Vec<String>,
    pub predecessor: Option<Rbn>,
    pub successor: Option<Rbn>,
}

impl Block {
    /// An active, unlinked block
    pub fn new(rbn: Rbn, records: Vec<String>) -> Self {
        Self {
            rbn,
            is_available: false,
            records,
            predecessor: None,
            successor: None,
        }
    }

    /// Serialized size of the record payload (records plus separators)
    pub fn payload_size(&self) -> usize {
        payload_size(&self.records)
    }

    /// Render as a block file line (without the trailing newline)
    pub fn to_line(&self) -> String {
        let mut line = format!("{}{}", self.rbn, RBN_SEPARATOR);
        line.push_str(&self.records.join(&FIELD_SEPARATOR.to_string()));
        line
    }

    /// Parse a block file line into its RBN and records.
    ///
    /// With `fields_per_record = Some(k)` the comma tokens are regrouped into
    /// records of `k` fields; otherwise every token is its own record.
    pub fn parse_line(
        line: &str,
        line_no: usize,
        fields_per_record: Option<usize>,
    ) -> Result<(Rbn, Vec<String>)> {
        let (rbn_text, payload) = line.split_once(RBN_SEPARATOR).ok_or_else(|| {
            SeqSetError::Format(format!("block line {}: missing '{}'", line_no, RBN_SEPARATOR))
        })?;

        let rbn = rbn_text.trim().parse::<Rbn>().map_err(|_| {
            SeqSetError::Format(format!(
                "block line {}: malformed RBN {:?}",
                line_no, rbn_text
            ))
        })?;

        if payload.is_empty() {
            return Ok((rbn, Vec::new()));
        }

        let tokens: Vec<&str> = payload.split(FIELD_SEPARATOR).collect();
        let records = match fields_per_record {
            None | Some(1) => tokens.into_iter().map(str::to_string).collect(),
            Some(0) => {
                return Err(SeqSetError::Format(
                    "record width of zero fields".to_string(),
                ));
            }
            Some(k) => {
                if tokens.len() % k != 0 {
                    return Err(SeqSetError::Format(format!(
                        "block {} (line {}): {} fields is not a multiple of the record width {}",
                        rbn,
                        line_no,
                        tokens.len(),
                        k
                    )));
                }
                tokens
                    .chunks(k)
                    .map(|chunk| chunk.join(&FIELD_SEPARATOR.to_string()))
                    .collect()
            }
        };

        Ok((rbn, records))
    }
}

/// Serialized size of a record list joined by separators
pub fn payload_size<S: AsRef<str>>(records: &[S]) -> usize {
    let bytes: usize = records.iter().map(|r| r.as_ref().len()).sum();
    bytes + records.len().saturating_sub(1)
}

//! Descriptor Module
//!
//! The header record describing a blocked sequence set file.
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │ Scalar line (length-indicated fields, comma-joined):              │
//! │   structure_type, version, block_size, min_fill_ratio,            │
//! │   size_format, index_file_name, record_count, field_count,        │
//! │   primary_key_field                                               │
//! ├────────────────────────────────────────────────────────────────────┤
//! │ Schema lines (field_count of them):                                │
//! │   name, type_tag                                                   │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//! Numeric scalars are stringified before encoding. Nothing in the file is
//! defaulted on read: a missing or malformed value is a format error.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, SeqSetError};
use crate::record::{encode_raw_field, FieldCursor, FIELD_SEPARATOR};
use crate::staged::StagedFile;

/// Number of length-indicated values on the scalar line
const SCALAR_FIELD_COUNT: usize = 9;

/// One field of the record schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub type_tag: String,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
        }
    }
}

/// How record sizes are expressed in the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeFormat {
    /// Two-digit decimal length indicators
    Ascii,
    /// Native-endian binary length prefixes
    Binary,
}

impl SizeFormat {
    pub fn as_tag(&self) -> &'static str {
        match self {
            SizeFormat::Ascii => "ascii",
            SizeFormat::Binary => "binary",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "ascii" => Ok(SizeFormat::Ascii),
            "binary" => Ok(SizeFormat::Binary),
            other => Err(SeqSetError::Format(format!("unknown size format: {:?}", other))),
        }
    }
}

/// Payload bytes a block of `block_size` must reach to count as filled
pub fn min_fill_bytes(block_size: usize, min_fill_ratio: f64) -> usize {
    (block_size as f64 * min_fill_ratio).ceil() as usize
}

/// File header for a blocked sequence set
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub structure_type: String,
    pub version: String,
    pub block_size: usize,
    pub min_fill_ratio: f64,
    pub size_format: SizeFormat,
    pub index_file_name: String,
    pub record_count: u64,
    pub field_count: usize,
    pub primary_key_field: usize,
    pub schema: Vec<SchemaField>,
}

impl Descriptor {
    /// Describe a block file built with `config` holding `record_count` records
    pub fn from_config(config: &Config, record_count: u64) -> Self {
        Self {
            structure_type: config.structure_type.clone(),
            version: config.format_version.clone(),
            block_size: config.block_capacity,
            min_fill_ratio: config.min_fill_ratio,
            size_format: SizeFormat::Ascii,
            index_file_name: config.index_file_name.clone(),
            record_count,
            field_count: config.schema.len(),
            primary_key_field: config.primary_key_field,
            schema: config.schema.clone(),
        }
    }

    /// Check the structural contract
    pub fn validate(&self) -> Result<()> {
        if self.field_count != self.schema.len() {
            return Err(SeqSetError::Descriptor(format!(
                "field count {} does not match {} schema fields",
                self.field_count,
                self.schema.len()
            )));
        }
        if self.primary_key_field >= self.schema.len() {
            return Err(SeqSetError::Descriptor(format!(
                "primary key field {} is not a valid schema index (schema has {} fields)",
                self.primary_key_field,
                self.schema.len()
            )));
        }
        if self.block_size == 0 {
            return Err(SeqSetError::Descriptor("block size is zero".to_string()));
        }
        if !(self.min_fill_ratio > 0.0 && self.min_fill_ratio <= 1.0) {
            return Err(SeqSetError::Descriptor(format!(
                "minimum fill ratio {} is outside (0, 1]",
                self.min_fill_ratio
            )));
        }
        Ok(())
    }

    /// Minimum payload bytes a block should hold (advisory)
    pub fn min_block_bytes(&self) -> usize {
        min_fill_bytes(self.block_size, self.min_fill_ratio)
    }

    /// Serialize the descriptor
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.validate()?;

        let scalars = [
            self.structure_type.clone(),
            self.version.clone(),
            self.block_size.to_string(),
            self.min_fill_ratio.to_string(),
            self.size_format.as_tag().to_string(),
            self.index_file_name.clone(),
            self.record_count.to_string(),
            self.field_count.to_string(),
            self.primary_key_field.to_string(),
        ];
        writeln!(writer, "{}", join_tokens(&scalars)?)?;

        for field in &self.schema {
            writeln!(
                writer,
                "{}",
                join_tokens(&[field.name.clone(), field.type_tag.clone()])?
            )?;
        }

        Ok(())
    }

    /// Deserialize a descriptor, rejecting anything malformed or incomplete
    pub fn read<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut lines = reader.lines();

        let header = lines
            .next()
            .transpose()?
            .ok_or_else(|| SeqSetError::Format("descriptor is empty".to_string()))?;
        let scalars = decode_exact(
            header.trim_end_matches('\r'),
            SCALAR_FIELD_COUNT,
            "descriptor scalar line",
        )?;

        let structure_type = scalars[0].to_string();
        let version = scalars[1].to_string();
        let block_size = parse_number::<usize>(scalars[2], "block_size")?;
        let min_fill_ratio = parse_number::<f64>(scalars[3], "min_fill_ratio")?;
        let size_format = SizeFormat::from_tag(scalars[4])?;
        let index_file_name = scalars[5].to_string();
        let record_count = parse_number::<u64>(scalars[6], "record_count")?;
        let field_count = parse_number::<usize>(scalars[7], "field_count")?;
        let primary_key_field = parse_number::<usize>(scalars[8], "primary_key_field")?;

        let mut schema = Vec::with_capacity(field_count);
        for (i, line) in lines.enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                return Err(SeqSetError::Format(format!(
                    "blank line in descriptor schema block (schema line {})",
                    i + 1
                )));
            }
            let pair = decode_exact(line, 2, &format!("schema line {}", i + 1))?;
            schema.push(SchemaField::new(pair[0], pair[1]));
        }

        if schema.len() != field_count {
            return Err(SeqSetError::Format(format!(
                "descriptor declares {} fields but {} schema lines are present",
                field_count,
                schema.len()
            )));
        }

        let descriptor = Self {
            structure_type,
            version,
            block_size,
            min_fill_ratio,
            size_format,
            index_file_name,
            record_count,
            field_count,
            primary_key_field,
            schema,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Write the descriptor to `path` (staged, renamed into place)
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        self.stage(path)?.commit()
    }

    /// Write to a staged file without committing it
    pub(crate) fn stage(&self, path: &Path) -> Result<StagedFile> {
        let mut file = StagedFile::create(path)?;
        self.write(&mut file)?;
        Ok(file)
    }

    /// Read the descriptor stored at `path`
    pub fn read_from_path(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

fn join_tokens(values: &[String]) -> Result<String> {
    let tokens = values
        .iter()
        .map(|v| encode_raw_field(v))
        .collect::<Result<Vec<_>>>()?;
    Ok(tokens.join(&FIELD_SEPARATOR.to_string()))
}

/// Decode exactly `expected` fields from `line`
fn decode_exact<'a>(line: &'a str, expected: usize, what: &str) -> Result<Vec<&'a str>> {
    let mut cursor = FieldCursor::new(line);
    let mut values = Vec::with_capacity(expected);
    while !cursor.is_exhausted() {
        values.push(cursor.next_field()?);
    }
    if values.len() != expected {
        return Err(SeqSetError::Format(format!(
            "{}: expected {} fields, found {}",
            what,
            expected,
            values.len()
        )));
    }
    Ok(values)
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| {
        SeqSetError::Format(format!("descriptor field {} is not numeric: {:?}", name, value))
    })
}

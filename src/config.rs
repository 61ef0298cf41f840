//! Configuration for seqset
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::descriptor::SchemaField;
use crate::error::{Result, SeqSetError};

/// Main configuration for a sequence set instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── blocks.dat       (block file)
    ///     ├── blocks.hdr       (descriptor)
    ///     ├── blocks.lnk       (link table)
    ///     └── {index_file_name}
    pub data_dir: PathBuf,

    /// Name of the primary index file inside `data_dir`.
    /// Recorded in the descriptor.
    pub index_file_name: String,

    // -------------------------------------------------------------------------
    // Block Configuration
    // -------------------------------------------------------------------------
    /// Maximum serialized payload of a block (in bytes)
    pub block_capacity: usize,

    /// Minimum fill ratio recorded in the descriptor.
    /// Advisory only: underfull blocks are reported, never merged.
    pub min_fill_ratio: f64,

    /// Skip the first input line (a CSV header row)
    pub skip_header: bool,

    // -------------------------------------------------------------------------
    // Schema Configuration
    // -------------------------------------------------------------------------
    /// One entry per field of every record, in field order
    pub schema: Vec<SchemaField>,

    /// Ordinal of the primary key within `schema`
    pub primary_key_field: usize,

    // -------------------------------------------------------------------------
    // Descriptor Tags
    // -------------------------------------------------------------------------
    pub structure_type: String,
    pub format_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./seqset_data"),
            index_file_name: "blocks.idx".to_string(),
            block_capacity: 512,
            min_fill_ratio: 0.5,
            skip_header: true,
            schema: default_schema(),
            primary_key_field: 0,
            structure_type: "blocked_sequence_set".to_string(),
            format_version: "1.0".to_string(),
        }
    }
}

/// Postal code layout: zip, place, state, latitude, longitude
fn default_schema() -> Vec<SchemaField> {
    vec![
        SchemaField::new("zip_code", "string"),
        SchemaField::new("place_name", "string"),
        SchemaField::new("state", "string"),
        SchemaField::new("latitude", "float"),
        SchemaField::new("longitude", "float"),
    ]
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Number of comma-separated fields in every record
    pub fn fields_per_record(&self) -> usize {
        self.schema.len()
    }

    /// Check the settings that every component relies on
    pub fn validate(&self) -> Result<()> {
        if self.block_capacity == 0 {
            return Err(SeqSetError::Config(
                "block capacity must be greater than zero".to_string(),
            ));
        }
        if !(self.min_fill_ratio > 0.0 && self.min_fill_ratio <= 1.0) {
            return Err(SeqSetError::Config(format!(
                "minimum fill ratio must be in (0, 1], got {}",
                self.min_fill_ratio
            )));
        }
        if self.schema.is_empty() {
            return Err(SeqSetError::Config("schema has no fields".to_string()));
        }
        if self.primary_key_field >= self.schema.len() {
            return Err(SeqSetError::Config(format!(
                "primary key field {} is outside a schema of {} fields",
                self.primary_key_field,
                self.schema.len()
            )));
        }
        if self.index_file_name.is_empty() || self.index_file_name.contains(char::is_whitespace) {
            return Err(SeqSetError::Config(format!(
                "invalid index file name: {:?}",
                self.index_file_name
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the index file name
    pub fn index_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.index_file_name = name.into();
        self
    }

    /// Set the block capacity (in bytes)
    pub fn block_capacity(mut self, bytes: usize) -> Self {
        self.config.block_capacity = bytes;
        self
    }

    /// Set the advisory minimum fill ratio
    pub fn min_fill_ratio(mut self, ratio: f64) -> Self {
        self.config.min_fill_ratio = ratio;
        self
    }

    /// Skip (or keep) the first input line
    pub fn skip_header(mut self, skip: bool) -> Self {
        self.config.skip_header = skip;
        self
    }

    /// Replace the record schema
    pub fn schema(mut self, schema: Vec<SchemaField>) -> Self {
        self.config.schema = schema;
        self
    }

    /// Set the primary key ordinal
    pub fn primary_key_field(mut self, ordinal: usize) -> Self {
        self.config.primary_key_field = ordinal;
        self
    }

    /// Set the structure type tag written to the descriptor
    pub fn structure_type(mut self, tag: impl Into<String>) -> Self {
        self.config.structure_type = tag.into();
        self
    }

    /// Set the format version written to the descriptor
    pub fn format_version(mut self, version: impl Into<String>) -> Self {
        self.config.format_version = version.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

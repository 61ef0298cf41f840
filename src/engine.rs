//! Engine Module
//!
//! Ties the block store, descriptor and primary index to one data directory.
//!
//! ## Responsibilities
//! - Build the block file, descriptor, link table and index from records
//! - Reopen all of them on startup
//! - Serve point lookups: index → offset → block line → record

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::descriptor::Descriptor;
use crate::error::{Result, SeqSetError};
use crate::index::{self, PrimaryIndex};
use crate::record::FIELD_SEPARATOR;
use crate::storage::{Block, BlockStore, BuildReport, ChainStats, LinkTable, StagedBuild};

/// A blocked sequence set rooted at `config.data_dir`
///
/// Single-threaded: callers that share an engine must serialize access
/// themselves.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Blocks and both list heads
    store: BlockStore,

    /// Header of the current block file (None until something is loaded)
    descriptor: Option<Descriptor>,

    /// Loaded primary index
    index: PrimaryIndex,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const BLOCK_FILENAME: &'static str = "blocks.dat";
    const DESCRIPTOR_FILENAME: &'static str = "blocks.hdr";
    const LINKS_FILENAME: &'static str = "blocks.lnk";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create data directory if needed
    /// 2. Read the descriptor if one exists
    /// 3. Parse the block file using the descriptor's record width
    /// 4. Restore linkage from the link table (or physical order)
    /// 5. Load the primary index
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let descriptor_path = config.data_dir.join(Self::DESCRIPTOR_FILENAME);
        if !descriptor_path.exists() {
            tracing::info!(dir = %config.data_dir.display(), "opened empty sequence set");
            return Ok(Self {
                config,
                store: BlockStore::new(),
                descriptor: None,
                index: PrimaryIndex::default(),
            });
        }

        let descriptor = Descriptor::read_from_path(&descriptor_path)?;
        let block_path = config.data_dir.join(Self::BLOCK_FILENAME);
        let mut store = BlockStore::parse(&block_path, Some(descriptor.field_count))?;

        let links_path = config.data_dir.join(Self::LINKS_FILENAME);
        if links_path.exists() {
            store.apply_links(&LinkTable::load(&links_path)?)?;
        } else {
            tracing::warn!("no link table found, linking blocks in physical order");
            store.link_physical_order();
        }

        let index_path = config.data_dir.join(&descriptor.index_file_name);
        let index = if index_path.exists() {
            PrimaryIndex::load(&index_path)?
        } else {
            tracing::warn!(path = %index_path.display(), "index file missing, rebuilding");
            let entries = index::build_from_block_file(
                &block_path,
                descriptor.field_count,
                descriptor.primary_key_field,
            )?;
            index::write_entries(&index_path, &entries)?;
            PrimaryIndex::from_entries(entries)
        };

        tracing::info!(
            blocks = store.len(),
            records = descriptor.record_count,
            keys = index.len(),
            "opened sequence set"
        );

        Ok(Self {
            config,
            store,
            descriptor: Some(descriptor),
            index,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Replace the contents with the given ordered records
    ///
    /// Steps:
    /// 1. Build the block file (and the in-memory store) into a staged file
    /// 2. Index the in-memory blocks
    /// 3. Stage the descriptor, link table and index
    /// 4. Rename all four files into place
    ///
    /// Any failure before step 4 leaves the previous contents untouched.
    pub fn load<I, S>(&mut self, lines: I) -> Result<BuildReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let staged = BlockStore::stage_build(&self.config, lines, &self.block_path())?;
        self.install(staged)
    }

    /// Replace the contents with the lines of `input`
    pub fn load_file(&mut self, input: &Path) -> Result<BuildReport> {
        let staged = BlockStore::stage_build_from_file(&self.config, input, &self.block_path())?;
        self.install(staged)
    }

    fn install(&mut self, staged: StagedBuild) -> Result<BuildReport> {
        let entries = index::build_from_store(&staged.store, staged.descriptor.primary_key_field)?;

        let index_path = self.config.data_dir.join(&staged.descriptor.index_file_name);
        let descriptor_file = staged.descriptor.stage(&self.descriptor_path())?;
        let links_file = staged.store.link_table().stage(&self.links_path())?;
        let index_file = index::stage_entries(&index_path, &entries)?;

        let (store, descriptor, report) = staged.commit()?;
        links_file.commit()?;
        index_file.commit()?;
        descriptor_file.commit()?;

        self.index = PrimaryIndex::from_entries(entries);
        self.store = store;
        self.descriptor = Some(descriptor);

        Ok(report)
    }

    /// Get the record whose primary key equals `key`
    ///
    /// Returns:
    /// - `Ok(Some(record))`: found
    /// - `Ok(None)`: key not in the index
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(descriptor) = &self.descriptor else {
            return Ok(None);
        };
        let Some(offset) = self.index.lookup(key) else {
            return Ok(None);
        };

        let line = index::fetch_by_offset(&self.block_path(), offset)?;
        let (rbn, records) = Block::parse_line(&line, 0, Some(descriptor.field_count))?;

        records
            .into_iter()
            .find(|record| {
                record.split(FIELD_SEPARATOR).nth(descriptor.primary_key_field) == Some(key)
            })
            .map(Some)
            .ok_or_else(|| {
                SeqSetError::Consistency(format!(
                    "index maps {:?} to block {} at byte {}, but the block does not hold it",
                    key, rbn, offset
                ))
            })
    }

    /// Check the active and available chains
    pub fn verify(&self) -> Result<ChainStats> {
        self.store.verify()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    pub fn index(&self) -> &PrimaryIndex {
        &self.index
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn block_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::BLOCK_FILENAME)
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::DESCRIPTOR_FILENAME)
    }

    pub fn links_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::LINKS_FILENAME)
    }

    /// Path of the index file named by the descriptor (or the config)
    pub fn index_path(&self) -> PathBuf {
        let name = self
            .descriptor
            .as_ref()
            .map(|d| d.index_file_name.as_str())
            .unwrap_or(&self.config.index_file_name);
        self.config.data_dir.join(name)
    }
}

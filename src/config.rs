use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::index::types::MAX_BLOCK_BYTES;

// Final index file names, sibling paths inside one index directory
pub const INDEX_FILE: &str = "index.bin";
pub const LEXICON_FILE: &str = "lexicon.txt";
pub const BLOCK_META_FILE: &str = "blockMetaData.txt";
pub const PAGE_TABLE_FILE: &str = "pagetable.tsv";

/// Block builder configuration
///
/// These knobs tune the build; none of them change the on-disk layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// In-memory accumulator budget before a run is flushed, in bytes
    pub max_block_bytes: usize,
    /// Log a progress line every this many documents
    pub progress_interval: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_block_bytes: MAX_BLOCK_BYTES,
            progress_interval: 100_000,
        }
    }
}

impl BuilderConfig {
    /// Override the flush budget
    pub fn with_max_block_bytes(mut self, bytes: usize) -> Self {
        self.max_block_bytes = bytes;
        self
    }
}

/// Path helpers for an index directory
#[derive(Clone, Debug)]
pub struct IndexPaths {
    dir: PathBuf,
}

impl IndexPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_file(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn lexicon_file(&self) -> PathBuf {
        self.dir.join(LEXICON_FILE)
    }

    pub fn block_meta_file(&self) -> PathBuf {
        self.dir.join(BLOCK_META_FILE)
    }

    pub fn page_table_file(&self) -> PathBuf {
        self.dir.join(PAGE_TABLE_FILE)
    }

    /// Name of the k-th intermediate run file
    pub fn run_file(&self, k: usize) -> PathBuf {
        self.dir.join(format!("intermediate_{}.txt", k))
    }
}

//! Core types for the on-disk inverted index

use std::fmt;

/// External document identifier, as supplied by the collection
pub type DocId = u32;

/// Maximum number of postings stored in one physical block
pub const POSTINGS_PER_BLOCK: usize = 64;

/// Default in-memory accumulator budget for the block builder (100 MiB)
pub const MAX_BLOCK_BYTES: usize = 100 * 1024 * 1024;

/// A single posting: a term occurred `term_freq` times in `doc_id`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: u32,
}

impl Posting {
    pub fn new(doc_id: DocId, term_freq: u32) -> Self {
        Self { doc_id, term_freq }
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.doc_id, self.term_freq)
    }
}

/// Lexicon record: byte range and summary statistics of one posting list
///
/// `offset` is the byte position in the postings file where the term's
/// list begins; `length` the total bytes it occupies; `doc_freq` the
/// number of distinct documents. Entries tile the postings file
/// end-to-end in write order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexiconEntry {
    pub offset: u64,
    pub length: u32,
    pub doc_freq: u32,
}

impl LexiconEntry {
    /// Number of physical blocks covering this list
    pub fn block_count(&self) -> usize {
        (self.doc_freq as usize).div_ceil(POSTINGS_PER_BLOCK)
    }
}

/// Sidecar record describing one physical block of the postings file
///
/// Blocks are laid out contiguously in file order; absolute offsets are
/// reconstructed by prefix-summing `length` at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockMeta {
    /// Size of the block payload in bytes
    pub length: u32,
    /// Absolute docID of the last posting in the block (skip pointer)
    pub last_doc_id: DocId,
}

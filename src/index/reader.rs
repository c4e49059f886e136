//! List-access primitives over a final index directory
//!
//! The reader loads the lexicon and the block metadata once, keeps a
//! seekable handle on the postings file, and hands out per-term
//! `ListHandle`s. A handle materializes its term's full byte range and
//! walks it block by block; `next_geq` skips whole blocks through the
//! `last_doc_id` pointers and only decodes the block that can satisfy
//! the target.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::lexicon::Lexicon;
use super::postings::{decode_block, DecodedBlock};
use super::types::{DocId, LexiconEntry};
use crate::config::IndexPaths;
use crate::error::{CuttlefishError, Result};

/// One physical block with its absolute position in the postings file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSpan {
    pub offset: u64,
    pub length: u32,
    pub last_doc_id: DocId,
}

/// Block metadata with absolute offsets, built once per session
///
/// Immutable after load; shareable across query workers.
#[derive(Debug, Default)]
pub struct BlockIndex {
    spans: Vec<BlockSpan>,
}

impl BlockIndex {
    /// Load `blockMetaData.txt`, prefix-summing lengths into offsets
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut spans = Vec::new();
        let mut offset = 0u64;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (length, last_doc_id) =
                parse_meta_line(&line).ok_or_else(|| CuttlefishError::Parse {
                    file: PathBuf::from(path),
                    line: idx as u64 + 1,
                    message: format!("expected <length> <lastDocID>, got {:?}", line),
                })?;
            spans.push(BlockSpan {
                offset,
                length,
                last_doc_id,
            });
            offset += length as u64;
        }

        Ok(Self { spans })
    }

    pub fn spans(&self) -> &[BlockSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Sum of all block lengths, which must equal the postings file size
    pub fn total_bytes(&self) -> u64 {
        self.spans
            .last()
            .map(|s| s.offset + s.length as u64)
            .unwrap_or(0)
    }

    /// Binary search for the block starting exactly at `offset`
    ///
    /// A well-formed index puts every lexicon offset on a block
    /// boundary, so a miss means corruption.
    pub fn find_block_at(&self, offset: u64) -> Option<usize> {
        self.spans
            .binary_search_by_key(&offset, |span| span.offset)
            .ok()
    }
}

fn parse_meta_line(line: &str) -> Option<(u32, DocId)> {
    let mut fields = line.split_whitespace();
    let length = fields.next()?.parse().ok()?;
    let last_doc_id = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((length, last_doc_id))
}

/// Query-session view of a final index directory
#[derive(Debug)]
pub struct IndexReader {
    lexicon: Lexicon,
    blocks: BlockIndex,
    index_file: File,
}

impl IndexReader {
    /// Load the lexicon and block metadata and open the postings file
    ///
    /// Validates that the block-length prefix sum matches the postings
    /// file size before any list is served.
    pub fn open(dir: &Path) -> Result<Self> {
        let paths = IndexPaths::new(dir);
        let lexicon = Lexicon::load(&paths.lexicon_file())?;
        let blocks = BlockIndex::load(&paths.block_meta_file())?;
        let index_file = File::open(paths.index_file())?;

        let file_len = index_file.metadata()?.len();
        if blocks.total_bytes() != file_len {
            return Err(CuttlefishError::CorruptIndex(format!(
                "block metadata covers {} bytes but {} is {} bytes",
                blocks.total_bytes(),
                paths.index_file().display(),
                file_len
            )));
        }

        info!(
            terms = lexicon.len(),
            blocks = blocks.len(),
            bytes = file_len,
            "index opened"
        );
        Ok(Self {
            lexicon,
            blocks,
            index_file,
        })
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn block_index(&self) -> &BlockIndex {
        &self.blocks
    }

    /// Open a term's posting list; `Ok(None)` when the term is unknown
    ///
    /// Reads the term's entire byte range into the handle and locates
    /// its first block by exact-offset binary search.
    pub fn open_list(&self, term: &str) -> Result<Option<ListHandle<'_>>> {
        let entry = match self.lexicon.get(term) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };

        let mut buffer = vec![0u8; entry.length as usize];
        // Read/Seek through &File keeps open_list shareable: handles for
        // several terms of one query coexist on a single session
        let mut file = &self.index_file;
        file.seek(SeekFrom::Start(entry.offset))?;
        file.read_exact(&mut buffer)?;

        let first_block = self.blocks.find_block_at(entry.offset).ok_or_else(|| {
            CuttlefishError::CorruptIndex(format!(
                "lexicon offset {} of {:?} is not a block boundary",
                entry.offset, term
            ))
        })?;

        let block_count = entry.block_count();
        let spans = self
            .blocks
            .spans()
            .get(first_block..first_block + block_count)
            .ok_or_else(|| {
                CuttlefishError::CorruptIndex(format!(
                    "{:?} needs {} blocks at {} but the block index ends early",
                    term, block_count, first_block
                ))
            })?;

        let spanned: u64 = spans.iter().map(|s| s.length as u64).sum();
        if spanned != entry.length as u64 {
            return Err(CuttlefishError::CorruptIndex(format!(
                "{:?} spans {} bytes of blocks but the lexicon records {}",
                term, spanned, entry.length
            )));
        }

        Ok(Some(ListHandle {
            term: term.to_string(),
            entry,
            buffer,
            spans,
            current_block: 0,
            buffer_pos: 0,
            decoded: None,
            in_block_pos: 0,
        }))
    }
}

/// Decode the whole index back to text, one `<term> <docID>:<tf> ...`
/// line per term in ascending term order
///
/// Returns the number of terms written. The output of a well-formed
/// index round-trips: it equals the coalesced union of the runs the
/// index was merged from.
pub fn dump_to_writer(reader: &IndexReader, out: &mut impl Write) -> Result<u64> {
    let mut terms: Vec<&str> = reader.lexicon().iter().map(|(t, _)| t).collect();
    terms.sort_unstable();

    for term in &terms {
        let mut list = reader.open_list(term)?.ok_or_else(|| {
            CuttlefishError::CorruptIndex(format!("lexicon term {:?} has no posting list", term))
        })?;
        write!(out, "{}", term)?;
        let mut target = 0;
        while let Some((doc_id, term_freq)) = list.next_geq(target)? {
            write!(out, " {}:{}", doc_id, term_freq)?;
            target = match doc_id.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }
        writeln!(out)?;
    }

    Ok(terms.len() as u64)
}

/// Cursor over one term's posting list
///
/// Owned by a single query. Successive `next_geq` targets must be
/// non-decreasing; the handle caches the decoded block and its position
/// in it so forward scans are amortized O(1).
pub struct ListHandle<'a> {
    term: String,
    entry: LexiconEntry,
    buffer: Vec<u8>,
    spans: &'a [BlockSpan],
    /// Index into `spans` of the block under the cursor
    current_block: usize,
    /// Byte offset of that block inside `buffer`
    buffer_pos: usize,
    decoded: Option<DecodedBlock>,
    /// Resume position inside the decoded block
    in_block_pos: usize,
}

impl ListHandle<'_> {
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Number of distinct documents in the list
    pub fn doc_freq(&self) -> u32 {
        self.entry.doc_freq
    }

    /// Next posting with docID >= `target`; `Ok(None)` past the end
    pub fn next_geq(&mut self, target: DocId) -> Result<Option<(DocId, u32)>> {
        loop {
            let span = match self.spans.get(self.current_block) {
                Some(span) => *span,
                None => return Ok(None),
            };

            // Skip whole blocks through the sidecar pointers
            if span.last_doc_id < target {
                self.advance_block(span.length);
                continue;
            }

            if self.decoded.is_none() {
                self.decoded = Some(self.decode_current(span)?);
                self.in_block_pos = 0;
            }
            let block = self.decoded.as_ref().expect("decoded above");

            let rel = block.doc_ids[self.in_block_pos..].partition_point(|&d| d < target);
            let pos = self.in_block_pos + rel;
            if pos < block.doc_ids.len() {
                self.in_block_pos = pos;
                return Ok(Some((block.doc_ids[pos], block.term_freqs[pos])));
            }

            // Stale in-block cursor: the matching posting is behind us,
            // keep scanning forward from the next block
            self.advance_block(span.length);
        }
    }

    fn advance_block(&mut self, length: u32) {
        self.buffer_pos += length as usize;
        self.current_block += 1;
        self.decoded = None;
        self.in_block_pos = 0;
    }

    fn decode_current(&self, span: BlockSpan) -> Result<DecodedBlock> {
        let end = self.buffer_pos + span.length as usize;
        let payload = self.buffer.get(self.buffer_pos..end).ok_or_else(|| {
            CuttlefishError::CorruptIndex(format!(
                "block of {:?} extends past the list's byte range",
                self.term
            ))
        })?;
        let base = if self.current_block == 0 {
            0
        } else {
            self.spans[self.current_block - 1].last_doc_id
        };
        decode_block(payload, base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_block_index_prefix_sum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blockMetaData.txt");
        std::fs::write(&path, "10 64\n20 128\n5 130\n").unwrap();

        let index = BlockIndex::load(&path).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.total_bytes(), 35);

        let spans = index.spans();
        assert_eq!(spans[0].offset, 0);
        assert_eq!(spans[1].offset, 10);
        assert_eq!(spans[2].offset, 30);
        assert_eq!(spans[2].last_doc_id, 130);
    }

    #[test]
    fn test_find_block_at_requires_exact_match() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blockMetaData.txt");
        std::fs::write(&path, "10 64\n20 128\n").unwrap();

        let index = BlockIndex::load(&path).unwrap();
        assert_eq!(index.find_block_at(0), Some(0));
        assert_eq!(index.find_block_at(10), Some(1));
        assert_eq!(index.find_block_at(9), None);
        assert_eq!(index.find_block_at(30), None);
    }

    #[test]
    fn test_malformed_meta_line_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blockMetaData.txt");
        std::fs::write(&path, "10 64\nten 128\n").unwrap();

        let err = BlockIndex::load(&path).unwrap_err();
        assert!(matches!(err, CuttlefishError::Parse { line: 2, .. }));
    }
}

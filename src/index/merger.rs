//! K-way merge of intermediate runs into the final index
//!
//! One cursor per run feeds a min-heap keyed on `(term, run index)`; the
//! run-index tie-break keeps the merge deterministic for a given sorted
//! run list. Postings collected for a term are sorted by docID and
//! duplicate docIDs coalesced by summing their frequencies before the
//! list is cut into blocks.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::lexicon::LexiconWriter;
use super::postings::encode_posting_list;
use super::run::{RunReader, TermCursor};
use super::types::{BlockMeta, LexiconEntry, Posting};
use crate::config::{IndexPaths, PAGE_TABLE_FILE};
use crate::error::Result;

/// Outcome of one merge
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub terms: u64,
    pub blocks: u64,
    /// Total size of the postings file in bytes
    pub bytes: u64,
}

/// Sink receiving the merged index: postings file plus both sidecars
struct MergeOutput {
    index: BufWriter<File>,
    lexicon: LexiconWriter,
    block_meta: BufWriter<File>,
    offset: u64,
    summary: MergeSummary,
}

impl MergeOutput {
    fn create(paths: &IndexPaths) -> Result<Self> {
        Ok(Self {
            index: BufWriter::new(File::create(paths.index_file())?),
            lexicon: LexiconWriter::create(&paths.lexicon_file())?,
            block_meta: BufWriter::new(File::create(paths.block_meta_file())?),
            offset: 0,
            summary: MergeSummary::default(),
        })
    }

    /// Write one term's coalesced list as blocks plus sidecar records
    fn write_term(&mut self, term: &str, postings: &[Posting]) -> Result<()> {
        let mut bytes = Vec::new();
        let mut blocks: Vec<BlockMeta> = Vec::new();
        encode_posting_list(postings, &mut bytes, &mut blocks);

        self.index.write_all(&bytes)?;
        for block in &blocks {
            writeln!(self.block_meta, "{} {}", block.length, block.last_doc_id)?;
        }
        self.lexicon.add(
            term,
            &LexiconEntry {
                offset: self.offset,
                length: bytes.len() as u32,
                doc_freq: postings.len() as u32,
            },
        )?;

        self.offset += bytes.len() as u64;
        self.summary.terms += 1;
        self.summary.blocks += blocks.len() as u64;
        Ok(())
    }

    fn finish(mut self) -> Result<MergeSummary> {
        self.index.flush()?;
        self.block_meta.flush()?;
        self.lexicon.finish()?;
        self.summary.bytes = self.offset;
        Ok(self.summary)
    }
}

/// Coalesce a docID-sorted posting sequence: equal docIDs collapse into
/// one posting carrying the summed frequency
fn coalesce(postings: Vec<Posting>) -> Vec<Posting> {
    let mut result: Vec<Posting> = Vec::with_capacity(postings.len());
    for posting in postings {
        match result.last_mut() {
            Some(last) if last.doc_id == posting.doc_id => {
                last.term_freq += posting.term_freq;
            }
            _ => result.push(posting),
        }
    }
    result
}

/// Drive the heap merge over a set of cursors into `out`
fn merge_cursors<C: TermCursor>(readers: &mut [C], out: &mut MergeOutput) -> Result<()> {
    let mut heap: BinaryHeap<Reverse<(String, usize)>> = BinaryHeap::new();
    for (idx, reader) in readers.iter().enumerate() {
        if reader.has_next() {
            heap.push(Reverse((reader.current_term().to_string(), idx)));
        }
    }

    while let Some(Reverse((term, idx))) = heap.pop() {
        let mut postings = readers[idx].current_postings().to_vec();
        readers[idx].advance()?;
        if readers[idx].has_next() {
            heap.push(Reverse((readers[idx].current_term().to_string(), idx)));
        }

        // Drain every other run currently positioned on the same term
        while let Some(Reverse((next_term, _))) = heap.peek() {
            if *next_term != term {
                break;
            }
            let Reverse((_, same_idx)) = heap.pop().expect("peeked entry");
            postings.extend_from_slice(readers[same_idx].current_postings());
            readers[same_idx].advance()?;
            if readers[same_idx].has_next() {
                heap.push(Reverse((readers[same_idx].current_term().to_string(), same_idx)));
            }
        }

        postings.sort_by_key(|p| p.doc_id);
        let postings = coalesce(postings);
        out.write_term(&term, &postings)?;
    }

    Ok(())
}

/// List `intermediate_*.txt` files in `dir`, sorted by file name
pub fn list_run_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if path.is_file() && name.starts_with("intermediate_") && name.ends_with(".txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Merge every run in `intermediate_dir` into a final index at `final_dir`
///
/// Produces `index.bin`, `lexicon.txt`, and `blockMetaData.txt`; the page
/// table is copied alongside them when the builder left one in
/// `intermediate_dir`, so the final directory is self-contained.
pub fn merge_runs(intermediate_dir: &Path, final_dir: &Path) -> Result<MergeSummary> {
    let run_files = list_run_files(intermediate_dir)?;
    info!(runs = run_files.len(), "merging intermediate runs");

    let mut readers = Vec::with_capacity(run_files.len());
    for path in &run_files {
        readers.push(RunReader::open(path)?);
    }

    let paths = IndexPaths::new(final_dir);
    let mut out = MergeOutput::create(&paths)?;
    merge_cursors(&mut readers, &mut out)?;
    let summary = out.finish()?;

    let page_table_src = intermediate_dir.join(PAGE_TABLE_FILE);
    if page_table_src.is_file() {
        fs::copy(&page_table_src, paths.page_table_file())?;
    }

    info!(
        terms = summary.terms,
        blocks = summary.blocks,
        bytes = summary.bytes,
        "merge complete"
    );
    Ok(summary)
}

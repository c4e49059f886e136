//! SPIMI block builder
//!
//! Streams the collection once, accumulating term -> postings in memory
//! and flushing a sorted run whenever the size estimate reaches the
//! configured budget. The page table is written as a side effect, one
//! line per document in input order.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::Path;

use tracing::{debug, info};

use super::page_table::PageTableWriter;
use super::run::write_run;
use super::types::{DocId, Posting};
use crate::config::{BuilderConfig, IndexPaths};
use crate::error::Result;
use crate::tokenizer::tokenize;

/// Outcome of one build pass over a collection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Documents ingested into the page table and the accumulator
    pub documents: u64,
    /// Intermediate run files written
    pub runs: usize,
    /// Collection lines dropped (no TAB, or unparsable docID)
    pub skipped_lines: u64,
}

/// Streaming builder producing intermediate runs and the page table
pub struct IndexBuilder {
    config: BuilderConfig,
}

impl IndexBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    /// Parse `collection` and write runs plus `pagetable.tsv` into `out_dir`
    ///
    /// The accumulator never grows past `max_block_bytes` (estimated);
    /// each flush produces `intermediate_<k>.txt` in ascending term
    /// order. A final flush covers the tail after EOF.
    pub fn build(&self, collection: &Path, out_dir: &Path) -> Result<BuildSummary> {
        let paths = IndexPaths::new(out_dir);
        let file = File::open(collection)?;
        let mut reader = BufReader::new(file);
        let mut page_table = PageTableWriter::create(&paths.page_table_file())?;

        let mut accumulator: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        let mut estimated_bytes = 0usize;
        let mut summary = BuildSummary::default();

        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }

            let (doc_id, passage) = match split_record(&line) {
                Some(record) => record,
                None => {
                    summary.skipped_lines += 1;
                    continue;
                }
            };

            let tokens = tokenize(passage);
            page_table.add(doc_id, tokens.len() as u32)?;

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }

            for (term, freq) in freqs {
                estimated_bytes += term.len() + 2 * mem::size_of::<u32>();
                accumulator
                    .entry(term)
                    .or_default()
                    .push(Posting::new(doc_id, freq));
            }

            summary.documents += 1;
            if summary.documents % self.config.progress_interval == 0 {
                info!(documents = summary.documents, "builder progress");
            }

            if estimated_bytes >= self.config.max_block_bytes {
                self.flush(&paths, &mut accumulator, &mut summary.runs)?;
                estimated_bytes = 0;
            }
        }

        if !accumulator.is_empty() {
            self.flush(&paths, &mut accumulator, &mut summary.runs)?;
        }

        let page_table_entries = page_table.finish()?;
        info!(
            documents = summary.documents,
            runs = summary.runs,
            page_table_entries,
            skipped_lines = summary.skipped_lines,
            "build complete"
        );
        Ok(summary)
    }

    fn flush(
        &self,
        paths: &IndexPaths,
        accumulator: &mut BTreeMap<String, Vec<Posting>>,
        runs: &mut usize,
    ) -> Result<()> {
        let path = paths.run_file(*runs);
        write_run(&path, accumulator)?;
        debug!(run = %path.display(), terms = accumulator.len(), "flushed run");
        accumulator.clear();
        *runs += 1;
        Ok(())
    }
}

/// Split a collection line at its first TAB and parse the docID prefix
///
/// Returns `None` for lines the builder skips: no TAB, or a docID that is
/// not a non-negative 32-bit decimal.
fn split_record(line: &[u8]) -> Option<(DocId, &[u8])> {
    let tab = line.iter().position(|&b| b == b'\t')?;
    let doc_id = std::str::from_utf8(&line[..tab]).ok()?.parse().ok()?;
    let mut passage = &line[tab + 1..];
    if passage.last() == Some(&b'\n') {
        passage = &passage[..passage.len() - 1];
    }
    Some((doc_id, passage))
}

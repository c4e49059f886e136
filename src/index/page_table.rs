//! Page table: per-document token counts
//!
//! One line per input document, `<docID>\t<tokenCount>`, in collection
//! order. The ranker uses it for length normalization; the core only
//! writes and loads it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::types::DocId;
use crate::error::{CuttlefishError, Result};

/// Streaming writer for the page table
pub struct PageTableWriter {
    out: BufWriter<File>,
    entries: u64,
}

impl PageTableWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            entries: 0,
        })
    }

    /// Record one document's token count
    pub fn add(&mut self, doc_id: DocId, token_count: u32) -> Result<()> {
        writeln!(self.out, "{}\t{}", doc_id, token_count)?;
        self.entries += 1;
        Ok(())
    }

    /// Flush and report the number of entries written
    pub fn finish(mut self) -> Result<u64> {
        self.out.flush()?;
        Ok(self.entries)
    }
}

/// Loaded page table
#[derive(Debug, Default)]
pub struct PageTable {
    lengths: HashMap<DocId, u32>,
}

impl PageTable {
    /// Load a page table file; malformed lines are fatal
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lengths = HashMap::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (doc_id, token_count) = parse_line(&line)
                .ok_or_else(|| parse_error(path, idx as u64 + 1, &line))?;
            lengths.insert(doc_id, token_count);
        }

        Ok(Self { lengths })
    }

    /// Token count of a document, if known
    pub fn doc_length(&self, doc_id: DocId) -> Option<u32> {
        self.lengths.get(&doc_id).copied()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

fn parse_line(line: &str) -> Option<(DocId, u32)> {
    let (doc_id, token_count) = line.split_once('\t')?;
    Some((doc_id.parse().ok()?, token_count.trim_end().parse().ok()?))
}

fn parse_error(path: &Path, line: u64, content: &str) -> CuttlefishError {
    CuttlefishError::Parse {
        file: PathBuf::from(path),
        line,
        message: format!("expected <docID>\\t<tokenCount>, got {:?}", content),
    }
}

//! Term lexicon
//!
//! Text sidecar, one line per term: `<term> <offset> <length> <docFreq>`.
//! Lines are appended in merge order; consecutive entries tile the
//! postings file end-to-end.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::types::LexiconEntry;
use crate::error::{CuttlefishError, Result};

/// Append-only lexicon writer used by the merger
pub struct LexiconWriter {
    out: BufWriter<File>,
    terms: u64,
}

impl LexiconWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            terms: 0,
        })
    }

    pub fn add(&mut self, term: &str, entry: &LexiconEntry) -> Result<()> {
        writeln!(
            self.out,
            "{} {} {} {}",
            term, entry.offset, entry.length, entry.doc_freq
        )?;
        self.terms += 1;
        Ok(())
    }

    /// Flush and report the number of terms written
    pub fn finish(mut self) -> Result<u64> {
        self.out.flush()?;
        Ok(self.terms)
    }
}

/// In-memory lexicon loaded for a query session
///
/// Immutable after load; shareable across query workers.
#[derive(Debug, Default)]
pub struct Lexicon {
    entries: HashMap<String, LexiconEntry>,
}

impl Lexicon {
    /// Load a lexicon file; malformed lines are fatal
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut entries = HashMap::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (term, entry) =
                parse_line(&line).ok_or_else(|| parse_error(path, idx as u64 + 1, &line))?;
            entries.insert(term, entry);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, term: &str) -> Option<&LexiconEntry> {
        self.entries.get(term)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.entries.contains_key(term)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all terms, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LexiconEntry)> {
        self.entries.iter().map(|(t, e)| (t.as_str(), e))
    }
}

fn parse_line(line: &str) -> Option<(String, LexiconEntry)> {
    let mut fields = line.split_whitespace();
    let term = fields.next()?.to_string();
    let offset = fields.next()?.parse().ok()?;
    let length = fields.next()?.parse().ok()?;
    let doc_freq = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((
        term,
        LexiconEntry {
            offset,
            length,
            doc_freq,
        },
    ))
}

fn parse_error(path: &Path, line: u64, content: &str) -> CuttlefishError {
    CuttlefishError::Parse {
        file: PathBuf::from(path),
        line,
        message: format!("expected <term> <offset> <length> <docFreq>, got {:?}", content),
    }
}

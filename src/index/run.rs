//! Intermediate run files
//!
//! A run is one flush of the block builder: text lines of the form
//! `<term> <docID>:<tf> <docID>:<tf> ...` in ascending term order.
//! Runs are written once, consumed once by the merger, and deleted by
//! the operator afterwards.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::types::Posting;
use crate::error::{CuttlefishError, Result};

/// Serialize an accumulator to a run file
///
/// The `BTreeMap` iteration order gives the ascending term order the
/// merger relies on.
pub fn write_run(path: &Path, index: &BTreeMap<String, Vec<Posting>>) -> Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    for (term, postings) in index {
        out.write_all(term.as_bytes())?;
        for posting in postings {
            write!(out, " {}:{}", posting.doc_id, posting.term_freq)?;
        }
        out.write_all(b"\n")?;
    }

    out.flush()?;
    Ok(())
}

/// Cursor over a sorted stream of `(term, postings)` records
///
/// The k-way merge is written against this trait so it can be driven by
/// in-memory streams in tests as well as by on-disk runs.
pub trait TermCursor {
    /// Whether the cursor currently points at a record
    fn has_next(&self) -> bool;
    /// Term of the current record; undefined when `has_next` is false
    fn current_term(&self) -> &str;
    /// Postings of the current record, in ascending docID order
    fn current_postings(&self) -> &[Posting];
    /// Move to the next record; EOF is normal and flips `has_next`
    fn advance(&mut self) -> Result<()>;
}

/// Reader over one intermediate run file
#[derive(Debug)]
pub struct RunReader {
    path: PathBuf,
    reader: BufReader<File>,
    line_no: u64,
    current_term: String,
    current_postings: Vec<Posting>,
    exhausted: bool,
}

impl RunReader {
    /// Open a run and position the cursor on its first record
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            line_no: 0,
            current_term: String::new(),
            current_postings: Vec::new(),
            exhausted: false,
        };
        reader.advance()?;
        Ok(reader)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, message: impl Into<String>) -> CuttlefishError {
        CuttlefishError::CorruptRun {
            file: self.path.clone(),
            message: format!("line {}: {}", self.line_no, message.into()),
        }
    }

    fn parse_line(&self, line: &str) -> Result<(String, Vec<Posting>)> {
        let mut fields = line.split_whitespace();
        let term = fields
            .next()
            .ok_or_else(|| self.corrupt("empty record"))?
            .to_string();

        let mut postings = Vec::new();
        for field in fields {
            let (doc_id, term_freq) = field
                .split_once(':')
                .ok_or_else(|| self.corrupt(format!("posting without colon: {:?}", field)))?;
            let doc_id = doc_id
                .parse::<u32>()
                .map_err(|_| self.corrupt(format!("bad docID: {:?}", doc_id)))?;
            let term_freq = term_freq
                .parse::<u32>()
                .map_err(|_| self.corrupt(format!("bad term frequency: {:?}", term_freq)))?;
            postings.push(Posting::new(doc_id, term_freq));
        }

        if postings.is_empty() {
            return Err(self.corrupt("term without postings"));
        }
        Ok((term, postings))
    }
}

impl TermCursor for RunReader {
    fn has_next(&self) -> bool {
        !self.exhausted
    }

    fn current_term(&self) -> &str {
        &self.current_term
    }

    fn current_postings(&self) -> &[Posting] {
        &self.current_postings
    }

    fn advance(&mut self) -> Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            self.line_no += 1;
            if self.reader.read_line(&mut line)? == 0 {
                self.exhausted = true;
                self.current_term.clear();
                self.current_postings.clear();
                return Ok(());
            }
            // Runs end with a newline; a blank final line is not a record
            if !line.trim_end().is_empty() {
                break;
            }
        }

        let (term, postings) = self.parse_line(line.trim_end())?;
        self.current_term = term;
        self.current_postings = postings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_lines(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_write_then_read_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("intermediate_0.txt");

        let mut index = BTreeMap::new();
        index.insert("apple".to_string(), vec![Posting::new(1, 2)]);
        index.insert(
            "banana".to_string(),
            vec![Posting::new(3, 1), Posting::new(9, 4)],
        );
        write_run(&path, &index).unwrap();

        let mut reader = RunReader::open(&path).unwrap();
        assert!(reader.has_next());
        assert_eq!(reader.current_term(), "apple");
        assert_eq!(reader.current_postings(), &[Posting::new(1, 2)]);

        reader.advance().unwrap();
        assert_eq!(reader.current_term(), "banana");
        assert_eq!(
            reader.current_postings(),
            &[Posting::new(3, 1), Posting::new(9, 4)]
        );

        reader.advance().unwrap();
        assert!(!reader.has_next());
    }

    #[test]
    fn test_missing_colon_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = write_lines(&dir, "intermediate_0.txt", "apple 1:2 33\n");

        let err = RunReader::open(&path).unwrap_err();
        assert!(matches!(err, CuttlefishError::CorruptRun { .. }));
    }

    #[test]
    fn test_negative_doc_id_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = write_lines(&dir, "intermediate_0.txt", "apple -1:2\n");

        let err = RunReader::open(&path).unwrap_err();
        assert!(matches!(err, CuttlefishError::CorruptRun { .. }));
    }

    #[test]
    fn test_eof_is_normal() {
        let dir = TempDir::new().unwrap();
        let path = write_lines(&dir, "intermediate_0.txt", "");

        let reader = RunReader::open(&path).unwrap();
        assert!(!reader.has_next());
    }
}

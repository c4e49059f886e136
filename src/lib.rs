pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod tokenizer;

pub use config::{BuilderConfig, IndexPaths};
pub use error::{CuttlefishError, Result};
pub use index::{
    dump_to_writer, merge_runs, BuildSummary, IndexBuilder, IndexReader, Lexicon, ListHandle,
    MergeSummary, PageTable, Posting,
};
pub use tokenizer::{term_frequencies, tokenize};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

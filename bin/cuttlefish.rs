use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cuttlefish::config::BuilderConfig;
use cuttlefish::index::{dump_to_writer, merge_runs, IndexBuilder, IndexReader};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "cuttlefish")]
#[command(about = "Disk-resident inverted index builder and query primitives", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a collection into sorted intermediate runs plus the page table
    Index {
        /// Collection file: <docID>\t<passage> per line
        collection: PathBuf,

        /// Directory receiving intermediate_<k>.txt and pagetable.tsv
        out_dir: PathBuf,

        /// In-memory accumulator budget before a run is flushed
        #[arg(long, env = "CUTTLEFISH_MAX_BLOCK_BYTES")]
        max_block_bytes: Option<usize>,
    },

    /// K-way merge intermediate runs into a final index directory
    Merge {
        /// Directory holding the intermediate runs
        intermediate_dir: PathBuf,

        /// Directory receiving index.bin, lexicon.txt, blockMetaData.txt
        index_dir: PathBuf,
    },

    /// Print a term's postings as docID:termFreq pairs
    Lookup {
        /// Final index directory
        index_dir: PathBuf,

        /// Term to look up (tokenized the same way as the collection)
        term: String,

        /// Start from the first posting with docID >= this target
        #[arg(long, default_value_t = 0)]
        from: u32,
    },

    /// Decode the whole index back to one text line per term
    Dump {
        /// Final index directory
        index_dir: PathBuf,

        /// Output text file
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Index {
            collection,
            out_dir,
            max_block_bytes,
        } => {
            fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;

            let mut config = BuilderConfig::default();
            if let Some(bytes) = max_block_bytes {
                config = config.with_max_block_bytes(bytes);
            }

            let summary = IndexBuilder::new(config).build(&collection, &out_dir)?;
            info!(
                documents = summary.documents,
                runs = summary.runs,
                skipped_lines = summary.skipped_lines,
                "indexing finished"
            );
        }

        Command::Merge {
            intermediate_dir,
            index_dir,
        } => {
            fs::create_dir_all(&index_dir)
                .with_context(|| format!("creating {}", index_dir.display()))?;

            let summary = merge_runs(&intermediate_dir, &index_dir)?;
            info!(
                terms = summary.terms,
                blocks = summary.blocks,
                bytes = summary.bytes,
                "merge finished"
            );
        }

        Command::Lookup {
            index_dir,
            term,
            from,
        } => {
            let reader = IndexReader::open(&index_dir)?;
            match reader.open_list(&term)? {
                None => println!("term not found: {}", term),
                Some(mut list) => {
                    let mut out = String::new();
                    let mut target = from;
                    while let Some((doc_id, term_freq)) = list.next_geq(target)? {
                        if !out.is_empty() {
                            out.push(' ');
                        }
                        out.push_str(&format!("{}:{}", doc_id, term_freq));
                        target = match doc_id.checked_add(1) {
                            Some(next) => next,
                            None => break,
                        };
                    }
                    println!("{} {}", term, out);
                }
            }
        }

        Command::Dump {
            index_dir,
            output,
        } => {
            let reader = IndexReader::open(&index_dir)?;
            let mut out = BufWriter::new(File::create(&output)?);
            let terms = dump_to_writer(&reader, &mut out)?;
            out.flush()?;
            info!(terms, output = %output.display(), "index dumped");
        }
    }

    Ok(())
}

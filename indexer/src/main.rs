use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use vsm_core::persist::{load_lexicon, load_meta_if_present, save_lexicon, save_meta, IndexPaths, MetaFile, FORMAT_VERSION};
use vsm_core::records::{count_records, load_records, read_content};
use vsm_core::{search, Lexicon, Record, RecordSource};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a positional inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a corpus folder of `{id}.property` records
    Build {
        /// Corpus folder
        #[arg(long)]
        docs: PathBuf,
        /// Number of records; counts `.property` files when omitted
        #[arg(long)]
        count: Option<usize>,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
    },
    /// Rank the corpus against a space-separated keyword query
    Search {
        /// Index directory written by `build`
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        query: String,
        /// Corpus folder; defaults to the one recorded at build time
        #[arg(long)]
        docs: Option<PathBuf>,
        /// Number of records; defaults to the one recorded at build time
        #[arg(long)]
        count: Option<usize>,
        /// Maximum results to print
        #[arg(long, default_value_t = 10)]
        max: usize,
        /// Content lines to preview per result
        #[arg(long, default_value_t = 5)]
        preview_lines: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { docs, count, output } => build_index(&docs, count, &output),
        Commands::Search { index, query, docs, count, max, preview_lines } => {
            search_index(&index, &query, docs, count, max, preview_lines)
        }
    }
}

fn build_index(docs: &Path, count: Option<usize>, output: &Path) -> Result<()> {
    let count = match count {
        Some(n) => n,
        None => count_records(docs).with_context(|| format!("counting records in {}", docs.display()))?,
    };
    let records = load_records(docs, count)?;
    println!("Read {} files. Indexing...", records.len());

    let lexicon = Lexicon::build_from_source(&RecordSource::new(&records))?;
    println!("Get {} words.", lexicon.len());

    let paths = IndexPaths::new(output);
    save_lexicon(&paths, &lexicon)?;
    let meta = MetaFile {
        num_docs: records.len() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
        docs_dir: Some(docs.canonicalize().unwrap_or_else(|_| docs.to_path_buf())),
    };
    save_meta(&paths, &meta)?;
    println!("Write index to {}", paths.lexicon().display());

    tracing::info!(output = %output.display(), num_docs = meta.num_docs, num_terms = lexicon.len(), "index build complete");
    Ok(())
}

fn search_index(
    index: &Path,
    query: &str,
    docs: Option<PathBuf>,
    count: Option<usize>,
    max: usize,
    preview_lines: usize,
) -> Result<()> {
    let paths = IndexPaths::new(index);
    let meta = load_meta_if_present(&paths)
        .with_context(|| format!("reading {}", paths.meta().display()))?;
    let Some(docs) = docs.or_else(|| meta.as_ref().and_then(|m| m.docs_dir.clone())) else {
        bail!("no corpus folder recorded in {}; pass --docs", paths.meta().display());
    };
    let Some(count) = count.or_else(|| meta.as_ref().map(|m| m.num_docs as usize)) else {
        bail!("no document count recorded in {}; pass --count", paths.meta().display());
    };

    let lexicon = load_lexicon(&paths)?;
    println!("Get {} words from tmp {}", lexicon.len(), paths.lexicon().display());
    let records = load_records(&docs, count)?;

    let results = search(query, &lexicon, count as u32);
    println!("Get {} records.\n", results.len());

    for (i, result) in results.iter().take(max).enumerate() {
        let record = &records[result.doc_id as usize];
        println!("Record {}:", i + 1);
        println!("{result}");
        println!("Property:");
        println!("{record}");
        println!();
        println!("Content Preview:");
        print_preview(record, preview_lines);
        println!("{}", "-".repeat(30));
    }
    Ok(())
}

fn print_preview(record: &Record, lines: usize) {
    match read_content(&record.file_path) {
        Ok(text) => {
            for line in text.lines().take(lines) {
                println!("{line}");
            }
        }
        Err(e) => tracing::warn!(path = %record.file_path.display(), error = %e, "cannot preview content"),
    }
}

mod corpus;
mod html;
mod report;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use techscope_core::normalizer::load_stop_words;
use techscope_core::persist::{load_snapshot, save_snapshot, IndexFormat, IndexPaths};
use techscope_core::{IdfMode, IndexBuilder, Normalizer, NormalizerConfig, QueryEngine, ScoreModel};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, query and inspect a TF-IDF inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Binary,
    Json,
}

impl From<Format> for IndexFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Binary => IndexFormat::Binary,
            Format::Json => IndexFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from crawled pages and/or JSON/JSONL document files
    Build {
        /// Input path (file or directory)
        #[arg(long, default_value = "data/pages")]
        input: PathBuf,
        /// Output index directory
        #[arg(long, default_value = "index/data")]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Binary)]
        format: Format,
        /// Stop-word file (JSON array or one word per line) replacing the built-in list
        #[arg(long)]
        stopwords: Option<PathBuf>,
        /// Fold accented letters to their ASCII base instead of dropping them
        #[arg(long, default_value_t = false)]
        fold_diacritics: bool,
        /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
        /// Keep raw tf-idf weights instead of scaling each document to unit length
        #[arg(long, default_value_t = false)]
        no_l2: bool,
    },
    /// Run a query against a built index
    Search {
        #[arg(long, default_value = "index/data")]
        index: PathBuf,
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 10)]
        max_results: usize,
        /// Write the results to search_results_<timestamp>_<query>.json
        #[arg(long, default_value_t = false)]
        save: bool,
    },
    /// Print document, term and posting counts
    Stats {
        #[arg(long, default_value = "index/data")]
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, format, stopwords, fold_diacritics, smoothed_idf, no_l2 } => {
            let mut config = NormalizerConfig { fold_diacritics, ..NormalizerConfig::default() };
            if let Some(path) = stopwords {
                config.stop_words = load_stop_words(&path).with_context(|| format!("reading stop words from {}", path.display()))?;
            }
            let model = ScoreModel {
                idf: if smoothed_idf { IdfMode::Smoothed } else { IdfMode::Standard },
                l2_normalize: !no_l2,
            };
            build_index(&input, &output, format.into(), Normalizer::new(config), model)
        }
        Commands::Search { index, query, max_results, save } => {
            let engine = open_engine(&index)?;
            let page = engine.search_page(&query, max_results)?;
            report::print_results(&query, &page);
            if save {
                let path = report::save_results(Path::new("."), &query, max_results, &page)?;
                println!("Search results saved: {}", path.display());
            }
            Ok(())
        }
        Commands::Stats { index } => {
            let engine = open_engine(&index)?;
            report::print_stats(&index, &engine.stats()?);
            Ok(())
        }
    }
}

fn build_index(input: &Path, output: &Path, format: IndexFormat, normalizer: Normalizer, model: ScoreModel) -> Result<()> {
    // Nothing is written unless the whole corpus loads and the build completes.
    let corpus = corpus::load_corpus(input)?;
    let snapshot = IndexBuilder::new(normalizer, model).build(corpus)?;
    let manifest = save_snapshot(&IndexPaths::new(output), &snapshot, format)?;
    tracing::info!(
        output = %output.display(),
        documents = manifest.document_count,
        terms = manifest.term_count,
        postings = manifest.posting_count,
        "index build complete"
    );
    Ok(())
}

fn open_engine(index: &Path) -> Result<QueryEngine> {
    let snapshot = load_snapshot(&IndexPaths::new(index))
        .with_context(|| format!("loading index from {} (run `indexer build` first)", index.display()))?;
    Ok(QueryEngine::from_snapshot(snapshot))
}

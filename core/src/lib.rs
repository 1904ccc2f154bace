//! TF-IDF relevance index: normalization, term statistics, weighting,
//! inverted-index construction and ranked retrieval.
//!
//! ```no_run
//! use techscope_core::{IndexBuilder, QueryEngine, SourceDocument};
//!
//! let snapshot = IndexBuilder::default().build(vec![
//!     SourceDocument::new("doc1", "Python programming tutorial"),
//!     SourceDocument::new("doc2", "web development framework"),
//! ])?;
//! let engine = QueryEngine::from_snapshot(snapshot);
//! for hit in engine.search("python", 10)? {
//!     println!("{} {:.3} {}", hit.doc_id, hit.score, hit.meta.title);
//! }
//! # Ok::<(), techscope_core::Error>(())
//! ```

pub mod builder;
pub mod error;
pub mod index;
pub mod normalizer;
pub mod persist;
pub mod query;
pub mod scoring;
pub mod stats;

pub use builder::IndexBuilder;
pub use error::{Error, Result};
pub use index::{stats, DocId, DocMeta, DocumentTable, IndexSnapshot, IndexStats, InvertedIndex, SourceDocument};
pub use normalizer::{Normalizer, NormalizerConfig};
pub use query::{search_snapshot, QueryEngine, SearchPage, SearchResult};
pub use scoring::{IdfMode, ScoreModel, WeightVector};
pub use stats::{DocumentFrequencyTable, TermFrequencyVector};

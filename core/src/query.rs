//! Query evaluation over an immutable [`IndexSnapshot`].
//!
//! Scoring is a plain sum of the stored per-document weights of every query
//! token that exists in the index (OR semantics). Document vectors are not
//! re-normalized against the query. Ties on score are broken by ascending
//! document id, so rankings are a total order.

use crate::error::{Error, Result};
use crate::index::{DocId, DocMeta, IndexSnapshot, IndexStats};
use parking_lot::RwLock;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub score: f64,
    #[serde(flatten)]
    pub meta: DocMeta,
}

/// Top results plus the number of documents that matched at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchPage {
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

/// Evaluate `query` against `snapshot`.
///
/// `max_results` must be at least 1. A query with no searchable tokens yields
/// an empty page, or `InvalidArgument` when `reject_empty` is set.
pub fn search_snapshot(snapshot: &IndexSnapshot, query: &str, max_results: usize, reject_empty: bool) -> Result<SearchPage> {
    if max_results == 0 {
        return Err(Error::InvalidArgument("max_results must be a positive integer".into()));
    }
    let mut tokens = snapshot.normalizer.normalize(query);
    if tokens.is_empty() {
        if reject_empty {
            return Err(Error::InvalidArgument("query has no searchable terms".into()));
        }
        return Ok(SearchPage::default());
    }
    // Fixed accumulation order keeps per-document sums bit-identical for any
    // permutation of the query.
    tokens.sort_unstable();

    let mut scores: HashMap<&str, f64> = HashMap::new();
    for token in &tokens {
        let Some(postings) = snapshot.index.postings(token) else { continue };
        for (doc_id, weight) in postings {
            *scores.entry(doc_id.as_str()).or_insert(0.0) += weight;
        }
    }

    let mut ranked: Vec<(&str, f64)> = scores.into_iter().collect();
    ranked.sort_by(rank_order);
    let total_hits = ranked.len();
    ranked.truncate(max_results);

    let results = ranked
        .into_iter()
        .map(|(doc_id, score)| {
            let meta = snapshot
                .docs
                .get(doc_id)
                .ok_or_else(|| Error::DataConsistency { doc_id: doc_id.to_string() })?;
            Ok(SearchResult { doc_id: doc_id.to_string(), score, meta: meta.clone() })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(query, tokens = tokens.len(), total_hits, returned = results.len(), "search");
    Ok(SearchPage { total_hits, results })
}

fn rank_order(a: &(&str, f64), b: &(&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Serves searches from the current snapshot while allowing a new one to be
/// swapped in at any time.
///
/// Readers clone the `Arc` under a short read lock and search without holding
/// it, so an `install` never waits for in-flight queries and never changes
/// the data they see.
#[derive(Debug, Default)]
pub struct QueryEngine {
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    reject_empty: bool,
}

impl QueryEngine {
    /// An engine with no index; searches fail with `IndexUnavailable`.
    pub fn new() -> Self { Self::default() }

    pub fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        let engine = Self::new();
        engine.install(snapshot);
        engine
    }

    /// Treat queries that normalize to nothing as `InvalidArgument`.
    pub fn reject_empty_queries(mut self, reject: bool) -> Self {
        self.reject_empty = reject;
        self
    }

    /// Atomically replace the served snapshot, returning the previous one.
    pub fn install(&self, snapshot: IndexSnapshot) -> Option<Arc<IndexSnapshot>> {
        let next = Arc::new(snapshot);
        self.current.write().replace(next)
    }

    pub fn current(&self) -> Result<Arc<IndexSnapshot>> {
        self.current.read().clone().ok_or(Error::IndexUnavailable)
    }

    pub fn is_loaded(&self) -> bool { self.current.read().is_some() }

    pub fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        Ok(self.search_page(query, max_results)?.results)
    }

    pub fn search_page(&self, query: &str, max_results: usize) -> Result<SearchPage> {
        let snapshot = self.current()?;
        search_snapshot(&snapshot, query, max_results, self.reject_empty)
    }

    pub fn stats(&self) -> Result<IndexStats> { Ok(self.current()?.stats()) }
}

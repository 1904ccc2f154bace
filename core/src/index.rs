use crate::error::{Error, Result};
use crate::normalizer::Normalizer;
use crate::scoring::{ScoreModel, WeightVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DocId = String;

/// One document as handed over by a corpus source, before indexing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocument {
    pub id: DocId,
    pub text: String,
    pub title: Option<String>,
    pub url: Option<String>,
    /// Source-provided fields carried into the metadata table verbatim.
    pub extra: BTreeMap<String, String>,
}

impl SourceDocument {
    pub fn new(id: impl Into<DocId>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), ..Self::default() }
    }

    /// Decode raw bytes as UTF-8. Undecodable input is indexed as an empty
    /// document rather than failing the build.
    pub fn from_bytes(id: impl Into<DocId>, bytes: &[u8]) -> Self {
        let id = id.into();
        let text = match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(e) => {
                tracing::warn!(doc_id = %id, error = %e, "undecodable document text, indexing as empty");
                String::new()
            }
        };
        Self { id, text, ..Self::default() }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub title: String,
    pub url: Option<String>,
    pub token_count: usize,
    pub unique_token_count: usize,
    /// RFC 3339 time the build processed this document.
    pub processed_at: String,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// document id -> metadata
pub type DocumentTable = BTreeMap<DocId, DocMeta>;

/// token -> document id -> weight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    terms: BTreeMap<String, BTreeMap<DocId, f64>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Set the weight of `term` in `doc_id`, returning the weight it replaced.
    pub fn insert(&mut self, term: impl Into<String>, doc_id: impl Into<DocId>, weight: f64) -> Option<f64> {
        self.terms.entry(term.into()).or_default().insert(doc_id.into(), weight)
    }

    /// Add every (token, weight) of one document's weight vector.
    pub fn add_document(&mut self, doc_id: &str, weights: &WeightVector) {
        for (term, &w) in weights {
            self.insert(term.as_str(), doc_id, w);
        }
    }

    pub fn postings(&self, term: &str) -> Option<&BTreeMap<DocId, f64>> { self.terms.get(term) }

    pub fn weight(&self, term: &str, doc_id: &str) -> f64 {
        self.postings(term).and_then(|p| p.get(doc_id)).copied().unwrap_or(0.0)
    }

    pub fn documents_for_term(&self, term: &str) -> Vec<&str> {
        self.postings(term)
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &BTreeMap<DocId, f64>)> + '_ {
        self.terms.iter().map(|(t, p)| (t.as_str(), p))
    }

    pub fn term_count(&self) -> usize { self.terms.len() }

    pub fn posting_count(&self) -> usize { self.terms.values().map(BTreeMap::len).sum() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub term_count: usize,
    pub posting_count: usize,
}

impl IndexStats {
    pub fn average_terms_per_document(&self) -> f64 {
        if self.document_count == 0 {
            return 0.0;
        }
        self.posting_count as f64 / self.document_count as f64
    }
}

pub fn stats(index: &InvertedIndex, docs: &DocumentTable) -> IndexStats {
    IndexStats {
        document_count: docs.len(),
        term_count: index.term_count(),
        posting_count: index.posting_count(),
    }
}

/// An immutable, queryable index: postings, metadata, and the rules that
/// produced them.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub index: InvertedIndex,
    pub docs: DocumentTable,
    pub normalizer: Normalizer,
    pub score_model: ScoreModel,
}

impl IndexSnapshot {
    pub fn new(index: InvertedIndex, docs: DocumentTable, normalizer: Normalizer, score_model: ScoreModel) -> Self {
        Self { index, docs, normalizer, score_model }
    }

    pub fn stats(&self) -> IndexStats { stats(&self.index, &self.docs) }

    /// Check that every indexed document has a metadata entry.
    pub fn verify(&self) -> Result<()> {
        for (_, postings) in self.index.terms() {
            if let Some(doc_id) = postings.keys().find(|d| !self.docs.contains_key(*d)) {
                return Err(Error::DataConsistency { doc_id: doc_id.clone() });
            }
        }
        Ok(())
    }
}

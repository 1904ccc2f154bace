//! Two-pass index construction.
//!
//! Pass one normalizes every document (in parallel) and keeps only its token
//! sequence. The document-frequency table is then reduced over the whole
//! corpus; no weight is computed before it is complete. Pass two turns each
//! token sequence into a weight vector against that shared table, and the
//! vectors are inverted into postings.

use crate::error::{Error, Result};
use crate::index::{DocMeta, DocumentTable, IndexSnapshot, InvertedIndex};
use crate::normalizer::Normalizer;
use crate::scoring::{ScoreModel, WeightVector};
use crate::stats::{document_frequency, term_frequency};
use crate::{DocId, SourceDocument};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use time::format_description::well_known::Rfc3339;

pub const UNTITLED: &str = "No title";

/// Metadata gathered in pass one, completed into a [`DocMeta`] at the end.
struct Pending {
    id: DocId,
    title: Option<String>,
    url: Option<String>,
    extra: BTreeMap<String, String>,
    unique_token_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    normalizer: Normalizer,
    model: ScoreModel,
}

impl IndexBuilder {
    pub fn new(normalizer: Normalizer, model: ScoreModel) -> Self { Self { normalizer, model } }

    /// Build a complete snapshot from an entire corpus.
    ///
    /// Document ids must be unique; a repeated id aborts the build. Documents
    /// without any token keep a metadata entry but add no postings. An empty
    /// corpus produces an empty snapshot.
    pub fn build<I>(&self, corpus: I) -> Result<IndexSnapshot>
    where
        I: IntoIterator<Item = SourceDocument>,
    {
        let corpus: Vec<SourceDocument> = corpus.into_iter().collect();
        let mut seen = HashSet::with_capacity(corpus.len());
        for doc in &corpus {
            if !seen.insert(doc.id.as_str()) {
                return Err(Error::DuplicateDocument(doc.id.clone()));
            }
        }
        drop(seen);

        let processed_at = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        let total_documents = corpus.len();

        // Pass one: raw text is dropped as soon as it is tokenized.
        let (pending, token_seqs): (Vec<Pending>, Vec<Vec<String>>) = corpus
            .into_par_iter()
            .map(|doc| {
                let tokens = self.normalizer.normalize(&doc.text);
                let unique_token_count = tokens.iter().collect::<HashSet<_>>().len();
                let pending = Pending { id: doc.id, title: doc.title, url: doc.url, extra: doc.extra, unique_token_count };
                (pending, tokens)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .unzip();

        let df = document_frequency(&token_seqs);
        tracing::debug!(documents = total_documents, distinct_terms = df.len(), "document frequency computed");

        // Pass two
        let weights: Vec<WeightVector> = token_seqs
            .par_iter()
            .map(|tokens| self.model.weigh(&term_frequency(tokens), &df, total_documents))
            .collect();

        let mut index = InvertedIndex::new();
        let mut docs = DocumentTable::new();
        for ((p, tokens), w) in pending.into_iter().zip(&token_seqs).zip(&weights) {
            if tokens.is_empty() {
                tracing::debug!(doc_id = %p.id, "document has no indexable tokens");
            }
            index.add_document(&p.id, w);
            docs.insert(
                p.id,
                DocMeta {
                    title: p.title.unwrap_or_else(|| UNTITLED.to_string()),
                    url: p.url,
                    token_count: tokens.len(),
                    unique_token_count: p.unique_token_count,
                    processed_at: processed_at.clone(),
                    extra: p.extra,
                },
            );
        }

        tracing::info!(
            documents = docs.len(),
            terms = index.term_count(),
            postings = index.posting_count(),
            "index build complete"
        );
        Ok(IndexSnapshot::new(index, docs, self.normalizer.clone(), self.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_keeps_metadata_only() {
        let snap = IndexBuilder::default()
            .build(vec![SourceDocument::new("d1", "rust search"), SourceDocument::new("d2", "the of and")])
            .unwrap();
        let m = &snap.docs["d2"];
        assert_eq!((m.token_count, m.unique_token_count), (0, 0));
        assert_eq!(m.title, UNTITLED);
        assert!(snap.index.terms().all(|(_, p)| !p.contains_key("d2")));
    }

    #[test]
    fn duplicate_ids_abort_the_build() {
        let err = IndexBuilder::default()
            .build(vec![SourceDocument::new("d1", "a"), SourceDocument::new("d1", "b")])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDocument(id) if id == "d1"));
    }

    #[test]
    fn metadata_counts_tokens() {
        let snap = IndexBuilder::default()
            .build(vec![SourceDocument::new("d1", "rust rust web").with_title("Rust").with_url("http://x")])
            .unwrap();
        let m = &snap.docs["d1"];
        assert_eq!(m.title, "Rust");
        assert_eq!(m.url.as_deref(), Some("http://x"));
        assert_eq!((m.token_count, m.unique_token_count), (3, 2));
    }
}

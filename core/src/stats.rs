//! Term statistics: per-document term frequency and corpus-wide document
//! frequency.

use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

/// token -> count / total tokens in the document
pub type TermFrequencyVector = BTreeMap<String, f64>;

/// token -> number of documents containing it at least once
pub type DocumentFrequencyTable = HashMap<String, u32>;

/// Relative frequency of every token in `tokens`. Empty input gives an empty vector.
pub fn term_frequency(tokens: &[String]) -> TermFrequencyVector {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    let total = tokens.len() as f64;
    counts
        .into_iter()
        .map(|(t, c)| (t.to_string(), c as f64 / total))
        .collect()
}

/// Count, for every token, how many of the given documents contain it.
///
/// Each worker folds distinct-token sets into a private table and the tables
/// are merged afterwards, so there are no shared counters.
pub fn document_frequency(documents: &[Vec<String>]) -> DocumentFrequencyTable {
    documents
        .par_iter()
        .fold(DocumentFrequencyTable::new, |mut df, tokens| {
            let distinct: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for t in distinct {
                *df.entry(t.to_string()).or_insert(0) += 1;
            }
            df
        })
        .reduce(DocumentFrequencyTable::new, merge_counts)
}

fn merge_counts(mut a: DocumentFrequencyTable, b: DocumentFrequencyTable) -> DocumentFrequencyTable {
    if a.len() < b.len() {
        return merge_counts(b, a);
    }
    for (t, c) in b {
        *a.entry(t).or_insert(0) += c;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn tf_is_relative_count() {
        let tf = term_frequency(&toks("rust rust web search"));
        assert_eq!(tf["rust"], 0.5);
        assert_eq!(tf["web"], 0.25);
        assert_eq!(tf.len(), 3);
        let sum: f64 = tf.values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tf_of_empty_document_is_empty() {
        assert!(term_frequency(&[]).is_empty());
    }

    #[test]
    fn df_counts_each_document_once() {
        let docs = vec![toks("rust rust rust"), toks("rust web"), toks("web")];
        let df = document_frequency(&docs);
        assert_eq!(df["rust"], 2);
        assert_eq!(df["web"], 2);
        assert_eq!(df.len(), 2);
    }

    #[test]
    fn df_of_empty_corpus_is_empty() {
        assert!(document_frequency(&[]).is_empty());
    }
}

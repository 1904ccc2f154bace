use proptest::prelude::*;
use techscope_core::stats::{document_frequency, term_frequency};
use techscope_core::{IndexBuilder, Normalizer, QueryEngine, SourceDocument};

fn word() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("the".to_string()),
        Just("and".to_string()),
        "[a-z]{1,6}",
        "[A-Za-z0-9-]{1,8}",
    ]
}

fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 0..20).prop_map(|w| w.join(" "))
}

fn corpus() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(text(), 1..8)
}

proptest! {
    #[test]
    fn normalization_is_deterministic(s in ".{0,200}") {
        let n = Normalizer::default();
        prop_assert_eq!(n.normalize(&s), n.normalize(&s));
    }

    #[test]
    fn tokens_are_clean(s in ".{0,200}") {
        let n = Normalizer::default();
        for t in n.normalize(&s) {
            prop_assert!(!t.is_empty());
            prop_assert!(t.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
            prop_assert!(!n.is_stop_word(&t));
        }
    }

    #[test]
    fn term_frequencies_sum_to_at_most_one(s in text()) {
        let tokens = Normalizer::default().normalize(&s);
        let tf = term_frequency(&tokens);
        let sum: f64 = tf.values().sum();
        prop_assert!(sum <= 1.0 + 1e-12);
        prop_assert!(tf.values().all(|&v| v > 0.0 && v <= 1.0));
        if !tokens.is_empty() {
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn document_frequency_is_bounded(texts in corpus()) {
        let n = Normalizer::default();
        let seqs: Vec<Vec<String>> = texts.iter().map(|t| n.normalize(t)).collect();
        let df = document_frequency(&seqs);
        for (term, &d) in &df {
            prop_assert!(d >= 1 && d as usize <= seqs.len(), "{} -> {}", term, d);
        }
    }

    #[test]
    fn universal_terms_weigh_zero(texts in corpus()) {
        let docs: Vec<SourceDocument> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| SourceDocument::new(format!("d{i}"), t.clone()))
            .collect();
        let total = docs.len();
        let snap = IndexBuilder::default().build(docs).unwrap();
        for (_, postings) in snap.index.terms() {
            if postings.len() == total {
                prop_assert!(postings.values().all(|&w| w == 0.0));
            }
        }
    }

    #[test]
    fn ranking_ignores_query_order(texts in corpus(), q in prop::collection::vec("[a-z]{1,6}", 1..5)) {
        let docs: Vec<SourceDocument> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| SourceDocument::new(format!("d{i}"), t.clone()))
            .collect();
        let engine = QueryEngine::from_snapshot(IndexBuilder::default().build(docs).unwrap());
        let mut reversed = q.clone();
        reversed.reverse();
        prop_assert_eq!(
            engine.search(&q.join(" "), 50).unwrap(),
            engine.search(&reversed.join(" "), 50).unwrap()
        );
    }
}

//! TF-IDF weighting.

use crate::stats::{DocumentFrequencyTable, TermFrequencyVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// token -> tf * idf, optionally scaled to unit length. Ordered so that
/// sums over a vector are reproducible.
pub type WeightVector = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfMode {
    /// `ln(N / df)`; a term present in every document weighs 0.
    #[default]
    Standard,
    /// `ln(1 + N / df)`; never zero for a present term.
    Smoothed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreModel {
    #[serde(default)]
    pub idf: IdfMode,
    /// Scale every document's weight vector to unit Euclidean length.
    pub l2_normalize: bool,
}

impl Default for ScoreModel {
    fn default() -> Self { Self { idf: IdfMode::Standard, l2_normalize: true } }
}

impl ScoreModel {
    /// Inverse document frequency; 0 for a term no document contains.
    pub fn idf(&self, df: u32, total_documents: usize) -> f64 {
        if df == 0 {
            return 0.0;
        }
        let ratio = total_documents as f64 / df as f64;
        match self.idf {
            IdfMode::Standard => ratio.ln(),
            IdfMode::Smoothed => (1.0 + ratio).ln(),
        }
    }

    /// Raw tf * idf weight for every token of one document.
    pub fn score(&self, tf: &TermFrequencyVector, df: &DocumentFrequencyTable, total_documents: usize) -> WeightVector {
        tf.iter()
            .map(|(t, &f)| {
                let d = df.get(t).copied().unwrap_or(0);
                (t.clone(), f * self.idf(d, total_documents))
            })
            .collect()
    }

    /// `score` followed by L2 normalization when the model asks for it.
    pub fn weigh(&self, tf: &TermFrequencyVector, df: &DocumentFrequencyTable, total_documents: usize) -> WeightVector {
        let weights = self.score(tf, df, total_documents);
        if self.l2_normalize { normalize(weights) } else { weights }
    }
}

/// Scale to unit Euclidean length. A zero vector stays all zeros.
pub fn normalize(mut weights: WeightVector) -> WeightVector {
    let magnitude = weights.values().map(|w| w * w).sum::<f64>().sqrt();
    for w in weights.values_mut() {
        *w = if magnitude > 0.0 { *w / magnitude } else { 0.0 };
    }
    weights
}

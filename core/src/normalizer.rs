//! Text normalization shared by indexing and querying.
//!
//! Index terms and query terms are compared as plain map keys, so both sides
//! must go through the same [`Normalizer`]. The rules are data
//! ([`NormalizerConfig`]) and travel with a persisted index.

use crate::error::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref MARKUP: Regex = Regex::new(r"<[^<>]*>").expect("valid regex");
}

/// Built-in English stop list: articles, conjunctions, prepositions, pronouns,
/// auxiliary verbs, demonstratives and a handful of quantifiers.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    // articles
    "the", "a", "an",
    // conjunctions
    "and", "or", "but", "nor", "yet", "so",
    // prepositions
    "in", "on", "at", "to", "for", "of", "by", "from", "up", "down", "into", "onto",
    "through", "during", "before", "after", "since", "until", "against", "among", "between",
    "behind", "beneath", "beside", "beyond", "inside", "outside", "under", "over", "above", "below",
    // pronouns
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them",
    "my", "your", "his", "its", "our", "their", "mine", "yours", "hers", "ours", "theirs",
    "myself", "yourself", "himself", "herself", "itself", "ourselves", "yourselves", "themselves",
    // auxiliaries
    "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "can", "must", "shall",
    // demonstratives
    "this", "that", "these", "those",
    // quantifiers and fillers
    "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no", "not",
    "only", "own", "same", "than", "too", "very", "just", "now", "then", "here", "there",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub stop_words: Vec<String>,
    /// Replace `<...>` sequences with whitespace before cleaning.
    #[serde(default = "default_true")]
    pub strip_markup: bool,
    /// Treat `-` as a word separator instead of deleting it.
    #[serde(default = "default_true")]
    pub split_hyphens: bool,
    /// NFKD-decompose first so accented letters keep their ASCII base.
    #[serde(default)]
    pub fold_diacritics: bool,
}

fn default_true() -> bool { true }

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
            strip_markup: true,
            split_hyphens: true,
            fold_diacritics: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    stop_words: HashSet<String>,
}

impl Default for Normalizer {
    fn default() -> Self { Self::new(NormalizerConfig::default()) }
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let stop_words = config
            .stop_words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { config, stop_words }
    }

    pub fn config(&self) -> &NormalizerConfig { &self.config }

    pub fn is_stop_word(&self, token: &str) -> bool { self.stop_words.contains(token) }

    /// Normalize raw text into index/query tokens.
    ///
    /// Lowercases, expands hyphens, keeps only ASCII letters and digits, splits
    /// on whitespace and drops stop words. Never fails: text with nothing
    /// indexable yields an empty vector.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        self.clean(text)
            .split_whitespace()
            .filter(|t| !self.is_stop_word(t))
            .map(str::to_string)
            .collect()
    }

    fn clean(&self, text: &str) -> String {
        let folded;
        let mut text = text;
        if self.config.fold_diacritics {
            folded = text.nfkd().collect::<String>();
            text = folded.as_str();
        }
        let stripped;
        if self.config.strip_markup {
            stripped = MARKUP.replace_all(text, " ");
            text = &*stripped;
        }

        let mut out = String::with_capacity(text.len());
        for c in text.to_lowercase().chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c);
            } else if c.is_whitespace() || c.is_control() || (c == '-' && self.config.split_hyphens) {
                out.push(' ');
            }
        }
        out
    }
}

/// Read a stop-word list: a JSON array of strings, or one word per line with
/// `#` comments.
pub fn load_stop_words(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    if raw.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(&raw)?);
    }
    Ok(raw
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_drops_punctuation() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("Hello, World! Rust's great."), vec!["hello", "world", "rusts", "great"]);
    }

    #[test]
    fn hyphens_become_separators() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("state-of-the-art"), vec!["state", "art"]);

        let joined = Normalizer::new(NormalizerConfig { split_hyphens: false, ..NormalizerConfig::default() });
        assert_eq!(joined.normalize("state-of-the-art"), vec!["stateoftheart"]);
    }

    #[test]
    fn strips_markup_and_control_chars() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("<p>fast\tsearch</p>\u{0007}engine"), vec!["fast", "search", "engine"]);
    }

    #[test]
    fn non_ascii_letters_are_removed_unless_folded() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("café"), vec!["caf"]);

        let folding = Normalizer::new(NormalizerConfig { fold_diacritics: true, ..NormalizerConfig::default() });
        assert_eq!(folding.normalize("café"), vec!["cafe"]);
    }

    #[test]
    fn empty_and_stop_only_input() {
        let n = Normalizer::default();
        assert!(n.normalize("").is_empty());
        assert!(n.normalize("   \n ").is_empty());
        assert!(n.normalize("The and OF").is_empty());
        assert!(n.normalize("!@#$%^&*()_+=[]{}|;':\",./<>?").is_empty());
    }

    #[test]
    fn custom_stop_words_are_lowercased() {
        let n = Normalizer::new(NormalizerConfig { stop_words: vec![" Rust ".into()], ..NormalizerConfig::default() });
        assert!(n.is_stop_word("rust"));
        assert_eq!(n.normalize("the rust book"), vec!["the", "book"]);
    }
}

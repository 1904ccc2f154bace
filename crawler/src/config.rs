//! Seed and delay resolution: command line first, then `config.json`, then
//! built-in defaults.

use anyhow::{bail, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SEEDS: &[&str] = &[
    "https://stackoverflow.com",
    "https://developer.mozilla.org",
    "https://docs.python.org",
    "https://w3schools.com",
];

pub const DEFAULT_CRAWL_DELAY: f64 = 0.005;

#[derive(Debug, Default, Deserialize)]
pub struct CrawlConfig {
    #[serde(default)]
    pub seed_urls: Vec<String>,
    #[serde(default)]
    pub crawl_delay: Option<f64>,
}

impl CrawlConfig {
    /// `None` when the file is absent or unusable; the crawl then falls back
    /// to the defaults.
    pub fn load(path: &Path) -> Option<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no crawl config, using defaults");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed crawl config");
                None
            }
        }
    }
}

/// Explicit seeds win. Otherwise the config's `seed_urls`, and without a
/// usable config the built-in list.
pub fn resolve_seeds(explicit: Vec<String>, config: Option<&CrawlConfig>) -> Vec<String> {
    if !explicit.is_empty() {
        return explicit;
    }
    match config {
        Some(c) if !c.seed_urls.is_empty() => c.seed_urls.clone(),
        _ => DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn resolve_delay(flag: Option<f64>, config: Option<&CrawlConfig>) -> Result<Duration> {
    let secs = flag
        .or_else(|| config.and_then(|c| c.crawl_delay))
        .unwrap_or(DEFAULT_CRAWL_DELAY);
    match Duration::try_from_secs_f64(secs) {
        Ok(d) => Ok(d),
        Err(e) => bail!("invalid crawl delay {secs}: {e}"),
    }
}

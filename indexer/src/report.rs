use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use techscope_core::{IndexStats, SearchPage};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

pub fn print_results(query: &str, page: &SearchPage) {
    if page.results.is_empty() {
        println!("No results found for '{query}'.");
        return;
    }
    println!("Found {} results for '{query}' (showing {}):", page.total_hits, page.results.len());
    for (i, hit) in page.results.iter().enumerate() {
        println!("{}. Score: {:.3}", i + 1, hit.score);
        println!("   Title: {}", hit.meta.title);
        println!("   URL: {}", hit.meta.url.as_deref().unwrap_or("No URL"));
        println!("   Doc ID: {}", hit.doc_id);
    }
}

pub fn print_stats(index_dir: &Path, stats: &IndexStats) {
    println!("Index directory: {}", index_dir.display());
    println!("Total documents: {}", stats.document_count);
    println!("Total terms: {}", stats.term_count);
    println!("Total postings: {}", stats.posting_count);
    println!("Average terms per document: {:.2}", stats.average_terms_per_document());
}

#[derive(Serialize)]
struct SavedSearch<'a> {
    timestamp: String,
    query: &'a str,
    max_results: usize,
    total_results: usize,
    results: &'a [techscope_core::SearchResult],
}

/// Write `search_results_<timestamp>_<query>.json` into `dir`.
pub fn save_results(dir: &Path, query: &str, max_results: usize, page: &SearchPage) -> Result<PathBuf> {
    let now = OffsetDateTime::now_utc();
    let stamp = now.format(format_description!("[year][month][day]_[hour][minute][second]"))?;
    let path = dir.join(format!("search_results_{stamp}_{}.json", file_safe(query)));
    let saved = SavedSearch {
        timestamp: now.format(&Rfc3339)?,
        query,
        max_results,
        total_results: page.results.len(),
        results: &page.results,
    };
    std::fs::write(&path, serde_json::to_vec_pretty(&saved)?)?;
    Ok(path)
}

fn file_safe(query: &str) -> String {
    query
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(30)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use techscope_core::{IndexBuilder, QueryEngine, SourceDocument};

    #[test]
    fn file_names_are_sanitized_and_short() {
        assert_eq!(file_safe("rust / web\\x"), "rust___web_x");
        assert_eq!(file_safe(&"a".repeat(50)).len(), 30);
    }

    #[test]
    fn saved_results_are_json() {
        let snap = IndexBuilder::default()
            .build(vec![SourceDocument::new("a", "rust web").with_title("A"), SourceDocument::new("b", "python")])
            .unwrap();
        let page = QueryEngine::from_snapshot(snap).search_page("rust", 5).unwrap();
        let dir = tempdir().unwrap();
        let path = save_results(dir.path(), "rust", 5, &page).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(json["query"], "rust");
        assert_eq!(json["total_results"], 1);
        assert_eq!(json["results"][0]["doc_id"], "a");
        assert_eq!(json["results"][0]["title"], "A");
    }
}

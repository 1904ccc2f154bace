use scraper::{Html, Selector};
use url::Url;

/// Canonical form used for the visited set: no fragment, no query and no
/// trailing slash, so `example.com/` and `example.com` are one page.
pub fn normalize_url(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);
    u.set_query(None);
    u.as_str().trim_end_matches('/').to_string()
}

pub fn is_crawlable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
}

/// Absolute http(s) targets of every `<a href>` in `html`, resolved against `base`.
pub fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let Ok(anchors) = Selector::parse("a[href]") else { return Vec::new() };
    let doc = Html::parse_document(html);
    doc.select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(is_crawlable)
        .collect()
}

pub fn parse_seed(raw: &str) -> Option<Url> {
    let s = raw.trim();
    if s.is_empty() || s.starts_with('#') {
        return None;
    }
    Url::parse(s)
        .or_else(|_| Url::parse(&format!("https://{s}")))
        .ok()
        .filter(is_crawlable)
}

//! Title and visible-text extraction from crawled HTML.

use scraper::{Html, Node, Selector};

/// Elements whose text never reaches the index.
const INVISIBLE: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: Option<String>,
    pub text: String,
}

pub fn extract(html: &str) -> Page {
    let doc = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| doc.select(&sel).next().map(|t| t.text().collect::<String>()))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let mut parts: Vec<&str> = Vec::new();
    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else { continue };
        let hidden = node
            .ancestors()
            .any(|a| matches!(a.value(), Node::Element(e) if INVISIBLE.contains(&e.name())));
        if !hidden {
            parts.extend(text.split_whitespace());
        }
    }

    Page { title, text: parts.join(" ") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_visible_text() {
        let page = extract(
            "<html><head><title> Rust Guide </title><style>body{color:red}</style></head>\
             <body><h1>Ownership</h1>\n<p>Borrowing   rules</p><script>var x = 1;</script></body></html>",
        );
        assert_eq!(page.title.as_deref(), Some("Rust Guide"));
        assert_eq!(page.text, "Rust Guide Ownership Borrowing rules");
    }

    #[test]
    fn missing_title_is_none() {
        let page = extract("<p>just text</p>");
        assert_eq!(page.title, None);
        assert_eq!(page.text, "just text");
    }
}

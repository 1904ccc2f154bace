use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Sidecar written next to every saved page. The indexer takes the page url
/// from `original_url` and keeps the remaining scalar fields as metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct PageMeta {
    pub original_url: String,
    pub content_length: usize,
    pub filename: String,
    pub status_code: u16,
    pub crawl_timestamp: String,
}

pub struct PageStore {
    dir: PathBuf,
}

impl PageStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn page_id(url: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Write `<id>.html` and `<id>.meta`; the html lands first so a sidecar
    /// never points at a missing page.
    pub fn save(&self, url: &str, html: &str, status_code: u16) -> Result<PathBuf> {
        let id = Self::page_id(url);
        let html_path = self.dir.join(format!("{id}.html"));
        fs::write(&html_path, html).with_context(|| format!("writing {}", html_path.display()))?;

        let meta = PageMeta {
            original_url: url.to_string(),
            content_length: html.len(),
            filename: html_path.display().to_string(),
            status_code,
            crawl_timestamp: OffsetDateTime::now_utc().format(&Rfc3339)?,
        };
        let meta_path = self.dir.join(format!("{id}.meta"));
        fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?)
            .with_context(|| format!("writing {}", meta_path.display()))?;
        Ok(html_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn saves_page_and_sidecar_under_hashed_name() {
        let dir = tempdir().unwrap();
        let store = PageStore::open(dir.path().join("pages")).unwrap();
        let path = store.save("https://example.com/a", "<p>hi</p>", 200).unwrap();

        let id = PageStore::page_id("https://example.com/a");
        assert_eq!(id.len(), 40);
        assert_eq!(path, store.dir().join(format!("{id}.html")));
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>hi</p>");

        let meta: PageMeta = serde_json::from_slice(&fs::read(store.dir().join(format!("{id}.meta"))).unwrap()).unwrap();
        assert_eq!(meta.original_url, "https://example.com/a");
        assert_eq!(meta.content_length, 9);
        assert_eq!(meta.status_code, 200);
        assert!(OffsetDateTime::parse(&meta.crawl_timestamp, &Rfc3339).is_ok());
    }

    #[test]
    fn same_url_overwrites() {
        let dir = tempdir().unwrap();
        let store = PageStore::open(dir.path()).unwrap();
        store.save("https://example.com", "old", 200).unwrap();
        store.save("https://example.com", "new", 200).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}

//! Corpus loading: crawled page directories and JSON/JSONL document files.
//!
//! A crawled page is `<id>.html` with an optional `<id>.meta` JSON sidecar as
//! written by the crawler. JSON inputs hold one document object, an array of
//! them, or (JSONL) one object per line.

use crate::html;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use techscope_core::SourceDocument;
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    #[serde(default)]
    title: Option<String>,
    body: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl From<InputDoc> for SourceDocument {
    fn from(doc: InputDoc) -> Self {
        let mut out = SourceDocument::new(doc.id, doc.body);
        out.title = doc.title;
        out.url = doc.url;
        if let Some(ts) = doc.timestamp {
            out.extra.insert("timestamp".into(), ts);
        }
        out
    }
}

/// Load every document under `input` (a file or a directory, walked
/// recursively in path order).
pub fn load_corpus(input: &Path) -> Result<Vec<SourceDocument>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        // A directory that cannot be walked fails the build rather than
        // silently shrinking the corpus.
        for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walking corpus directory {}", input.display()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("corpus input {} does not exist", input.display());
    }

    let mut docs = Vec::new();
    for file in files {
        match file.extension().and_then(|s| s.to_str()) {
            Some("html" | "htm") => docs.push(load_page(&file)?),
            Some("jsonl") => load_jsonl(&file, &mut docs)?,
            Some("json") => load_json(&file, &mut docs)?,
            _ => {}
        }
    }
    tracing::info!(input = %input.display(), documents = docs.len(), "corpus loaded");
    Ok(docs)
}

fn load_page(path: &Path) -> Result<SourceDocument> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("unusable file name {}", path.display()))?
        .to_string();
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    let mut doc = SourceDocument::from_bytes(id, &bytes);
    let page = html::extract(&doc.text);
    doc.text = page.text;
    doc.title = page.title;

    for (key, value) in read_sidecar(&path.with_extension("meta")) {
        if key == "original_url" {
            doc.url = Some(value);
        } else {
            doc.extra.insert(key, value);
        }
    }
    Ok(doc)
}

/// Scalar fields of a `.meta` sidecar as strings. A missing or malformed
/// sidecar only costs the metadata.
fn read_sidecar(path: &Path) -> BTreeMap<String, String> {
    let Ok(raw) = fs::read_to_string(path) else { return BTreeMap::new() };
    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed metadata sidecar");
            return BTreeMap::new();
        }
    };
    let serde_json::Value::Object(map) = value else { return BTreeMap::new() };
    map.into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            serde_json::Value::Number(n) => Some((k, n.to_string())),
            serde_json::Value::Bool(b) => Some((k, b.to_string())),
            _ => None,
        })
        .collect()
}

fn load_jsonl(file: &Path, docs: &mut Vec<SourceDocument>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: InputDoc = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid document", file.display(), n + 1))?;
        docs.push(doc.into());
    }
    Ok(())
}

fn load_json(file: &Path, docs: &mut Vec<SourceDocument>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value =
        serde_json::from_reader(reader).with_context(|| format!("{}: invalid JSON", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)?;
                docs.push(doc.into());
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            docs.push(doc.into());
        }
        _ => {}
    }
    Ok(())
}

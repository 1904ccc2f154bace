use crate::error::{Error, Result};
use crate::index::{DocumentTable, IndexSnapshot, InvertedIndex};
use crate::normalizer::{Normalizer, NormalizerConfig};
use crate::scoring::ScoreModel;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub const INDEX_VERSION: u32 = 2;

const GENERATION_PREFIX: &str = "gen-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFormat {
    /// bincode
    #[default]
    Binary,
    /// Pretty JSON: `{token: {doc_id: weight}}` and `{doc_id: metadata}`.
    Json,
}

impl IndexFormat {
    fn extension(self) -> &'static str {
        match self {
            IndexFormat::Binary => "bin",
            IndexFormat::Json => "json",
        }
    }
}

/// Written last by [`save_snapshot`]; names the generation directory that
/// holds the data files it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    #[serde(default)]
    pub generation: String,
    pub created_at: String,
    pub format: IndexFormat,
    pub document_count: usize,
    pub term_count: usize,
    pub posting_count: usize,
    pub normalizer: NormalizerConfig,
    pub score_model: ScoreModel,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn manifest(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn generation(&self, generation: &str) -> PathBuf { self.root.join(generation) }
    pub fn index(&self, generation: &str, format: IndexFormat) -> PathBuf {
        self.generation(generation).join(format!("inverted_index.{}", format.extension()))
    }
    pub fn documents(&self, generation: &str, format: IndexFormat) -> PathBuf {
        self.generation(generation).join(format!("documents.{}", format.extension()))
    }
    pub fn exists(&self) -> bool { self.manifest().is_file() }
}

/// Persist a snapshot.
///
/// Data files go into a new generation directory that nothing references yet;
/// the manifest is then swapped in with a rename. A reader therefore sees the
/// previous save or this one, never files from both. Older generations are
/// pruned afterwards, except the one the replaced manifest pointed at.
pub fn save_snapshot(paths: &IndexPaths, snapshot: &IndexSnapshot, format: IndexFormat) -> Result<Manifest> {
    fs::create_dir_all(&paths.root)?;
    let previous = load_manifest(paths).ok().map(|m| m.generation);

    let now = time::OffsetDateTime::now_utc();
    let generation = create_generation(paths, now.unix_timestamp_nanos())?;
    fs::write(paths.index(&generation, format), encode(format, &snapshot.index)?)?;
    fs::write(paths.documents(&generation, format), encode(format, &snapshot.docs)?)?;

    let stats = snapshot.stats();
    let manifest = Manifest {
        version: INDEX_VERSION,
        generation,
        created_at: now.format(&Rfc3339).unwrap_or_default(),
        format,
        document_count: stats.document_count,
        term_count: stats.term_count,
        posting_count: stats.posting_count,
        normalizer: snapshot.normalizer.config().clone(),
        score_model: snapshot.score_model,
    };
    write_atomic(&paths.manifest(), &serde_json::to_vec_pretty(&manifest)?)?;
    prune_generations(paths, &manifest.generation, previous.as_deref());
    tracing::info!(
        root = %paths.root.display(),
        generation = %manifest.generation,
        ?format,
        documents = stats.document_count,
        "index saved"
    );
    Ok(manifest)
}

pub fn load_manifest(paths: &IndexPaths) -> Result<Manifest> {
    if !paths.exists() {
        return Err(Error::IndexNotFound(paths.root.clone()));
    }
    let raw: serde_json::Value = serde_json::from_slice(&fs::read(paths.manifest())?)?;
    let found = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    if found != INDEX_VERSION {
        return Err(Error::UnsupportedVersion { found, expected: INDEX_VERSION });
    }
    Ok(serde_json::from_value(raw)?)
}

/// Load a snapshot saved by [`save_snapshot`], restoring the normalizer and
/// score model it was built with. Fails if any indexed document lacks metadata.
pub fn load_snapshot(paths: &IndexPaths) -> Result<IndexSnapshot> {
    let manifest = load_manifest(paths)?;
    let (generation, format) = (manifest.generation.as_str(), manifest.format);
    let index: InvertedIndex = decode(format, &fs::read(paths.index(generation, format))?)?;
    let docs: DocumentTable = decode(format, &fs::read(paths.documents(generation, format))?)?;
    let snapshot = IndexSnapshot::new(index, docs, Normalizer::new(manifest.normalizer), manifest.score_model);
    snapshot.verify()?;
    tracing::info!(
        root = %paths.root.display(),
        generation,
        documents = snapshot.docs.len(),
        terms = snapshot.index.term_count(),
        "index loaded"
    );
    Ok(snapshot)
}

fn create_generation(paths: &IndexPaths, stamp: i128) -> Result<String> {
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => format!("{GENERATION_PREFIX}{stamp}"),
            n => format!("{GENERATION_PREFIX}{stamp}-{n}"),
        };
        match fs::create_dir(paths.generation(&name)) {
            Ok(()) => return Ok(name),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Best effort: a generation that cannot be removed is left for the next save.
fn prune_generations(paths: &IndexPaths, current: &str, previous: Option<&str>) {
    let Ok(entries) = fs::read_dir(&paths.root) else { return };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(GENERATION_PREFIX) || name == current || Some(name.as_str()) == previous {
            continue;
        }
        if let Err(e) = fs::remove_dir_all(entry.path()) {
            tracing::warn!(generation = %name, error = %e, "could not prune old index generation");
        }
    }
}

fn encode<T: Serialize>(format: IndexFormat, value: &T) -> Result<Vec<u8>> {
    Ok(match format {
        IndexFormat::Binary => bincode::serialize(value)?,
        IndexFormat::Json => serde_json::to_vec_pretty(value)?,
    })
}

fn decode<T: DeserializeOwned>(format: IndexFormat, bytes: &[u8]) -> Result<T> {
    Ok(match format {
        IndexFormat::Binary => bincode::deserialize(bytes)?,
        IndexFormat::Json => serde_json::from_slice(bytes)?,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IndexBuilder, SourceDocument};
    use tempfile::tempdir;

    fn snapshot() -> IndexSnapshot {
        IndexBuilder::default()
            .build(vec![
                SourceDocument::new("d1", "rust search engine").with_title("Rust"),
                SourceDocument::new("d2", "python web framework").with_url("http://py"),
                SourceDocument::new("d3", "search the web"),
            ])
            .unwrap()
    }

    #[test]
    fn round_trips_in_both_formats() {
        for format in [IndexFormat::Binary, IndexFormat::Json] {
            let dir = tempdir().unwrap();
            let paths = IndexPaths::new(dir.path());
            let snap = snapshot();
            let manifest = save_snapshot(&paths, &snap, format).unwrap();
            assert_eq!(manifest.document_count, 3);
            let loaded = load_snapshot(&paths).unwrap();
            assert_eq!(loaded.index, snap.index);
            assert_eq!(loaded.docs, snap.docs);
            assert_eq!(loaded.normalizer.config(), snap.normalizer.config());
            assert_eq!(loaded.score_model, snap.score_model);
        }
    }

    #[test]
    fn missing_index_is_reported() {
        let dir = tempdir().unwrap();
        let err = load_snapshot(&IndexPaths::new(dir.path().join("nope"))).unwrap_err();
        assert!(matches!(err, Error::IndexNotFound(_)));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut manifest = save_snapshot(&paths, &snapshot(), IndexFormat::Binary).unwrap();
        manifest.version = 99;
        fs::write(paths.manifest(), serde_json::to_vec(&manifest).unwrap()).unwrap();
        assert!(matches!(
            load_snapshot(&paths),
            Err(Error::UnsupportedVersion { found: 99, expected: INDEX_VERSION })
        ));
    }

    #[test]
    fn no_temporary_files_remain() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let manifest = save_snapshot(&paths, &snapshot(), IndexFormat::Json).unwrap();
        for listing in [dir.path().to_path_buf(), paths.generation(&manifest.generation)] {
            let leftovers: Vec<_> = fs::read_dir(listing)
                .unwrap()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
                .collect();
            assert!(leftovers.is_empty());
        }
    }

    fn old_and_new() -> (IndexSnapshot, IndexSnapshot) {
        let old = IndexBuilder::default()
            .build(vec![
                SourceDocument::new("a", "rust rust book").with_title("OLD"),
                SourceDocument::new("b", "python"),
            ])
            .unwrap();
        let new = IndexBuilder::default()
            .build(vec![SourceDocument::new("a", "haskell").with_title("NEW"), SourceDocument::new("b", "ocaml")])
            .unwrap();
        (old, new)
    }

    fn generations(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(GENERATION_PREFIX))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn rebuild_in_place_writes_a_new_generation() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let (old, new) = old_and_new();
        let first = save_snapshot(&paths, &old, IndexFormat::Binary).unwrap();
        let second = save_snapshot(&paths, &new, IndexFormat::Binary).unwrap();
        assert_ne!(first.generation, second.generation);
        // The replaced generation stays intact until the next save.
        assert!(paths.index(&first.generation, IndexFormat::Binary).is_file());

        let loaded = load_snapshot(&paths).unwrap();
        assert_eq!(loaded.docs["a"].title, "NEW");
        assert!(loaded.index.postings("haskell").is_some());
        assert!(loaded.index.postings("rust").is_none());
    }

    #[test]
    fn interrupted_rebuild_keeps_serving_the_previous_save() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let (old, new) = old_and_new();
        save_snapshot(&paths, &old, IndexFormat::Binary).unwrap();
        let old_manifest = fs::read(paths.manifest()).unwrap();

        // New data lands on disk, but the manifest switch never happens.
        save_snapshot(&paths, &new, IndexFormat::Binary).unwrap();
        fs::write(paths.manifest(), &old_manifest).unwrap();

        let loaded = load_snapshot(&paths).unwrap();
        let a = &loaded.docs["a"];
        assert_eq!((a.title.as_str(), a.token_count), ("OLD", 3));
        assert!(loaded.index.weight("rust", "a") > 0.0);
        assert!(loaded.index.postings("haskell").is_none());
    }

    #[test]
    fn only_current_and_previous_generations_are_kept() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let (old, new) = old_and_new();
        save_snapshot(&paths, &old, IndexFormat::Json).unwrap();
        let second = save_snapshot(&paths, &new, IndexFormat::Json).unwrap();
        let third = save_snapshot(&paths, &old, IndexFormat::Json).unwrap();

        let mut expected = vec![second.generation, third.generation];
        expected.sort();
        assert_eq!(generations(dir.path()), expected);
    }
}

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index unavailable: no index has been built or loaded")]
    IndexUnavailable,

    /// The inverted index references a document the metadata table does not know.
    #[error("document {doc_id} is indexed but has no metadata entry; index and metadata are out of sync")]
    DataConsistency { doc_id: String },

    #[error("duplicate document id in corpus: {0}")]
    DuplicateDocument(String),

    #[error("no index found at {0}")]
    IndexNotFound(PathBuf),

    #[error("unsupported index version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary codec error: {0}")]
    Bincode(#[from] bincode::Error),
}

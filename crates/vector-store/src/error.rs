use crate::types::ContentKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Cannot build an index from zero texts")]
    EmptyInput,

    #[error(
        "Embedding model mismatch for {kind} store '{store}': record built with '{found}', provider is '{expected}'"
    )]
    ModelMismatch {
        store: String,
        kind: ContentKind,
        expected: String,
        found: String,
    },

    #[error("Persistence error ({op}) for {kind} store '{store}': {source}")]
    Persistence {
        store: String,
        kind: ContentKind,
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Query k must be >= 1")]
    InvalidK,

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Invalid store name {0:?}: slug is empty")]
    InvalidStoreName(String),

    #[error("Store '{store}' is a {actual} store, expected {expected}")]
    ContentKindMismatch {
        store: String,
        expected: ContentKind,
        actual: ContentKind,
    },

    #[error("Corrupt store record: {0}")]
    Corrupt(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Index encoding error: {0}")]
    IndexEncoding(#[from] rmp_serde::encode::Error),

    #[error("{0}")]
    Other(String),
}

impl VectorStoreError {
    pub(crate) fn persistence(
        store: &str,
        kind: ContentKind,
        op: &'static str,
        source: std::io::Error,
    ) -> Self {
        Self::Persistence {
            store: store.to_string(),
            kind,
            op,
            source,
        }
    }
}

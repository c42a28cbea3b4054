use crate::transcript::TranscriptError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PodcastError>;

#[derive(Error, Debug)]
pub enum PodcastError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] podcast_vector_store::VectorStoreError),

    #[error("Feed error: {0:#}")]
    FeedError(#[source] anyhow::Error),

    #[error("Transcript error: {0}")]
    TranscriptError(#[from] TranscriptError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

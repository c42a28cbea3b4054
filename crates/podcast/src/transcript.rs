use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Identifies the episode whose transcript is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRef {
    /// Slug used to name the transcript.
    pub id: String,
    /// Audio location.
    pub source_url: String,
}

/// A finished transcript on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptHandle {
    path: PathBuf,
}

impl TranscriptHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read_text(&self) -> Result<String, TranscriptError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| TranscriptError::Read {
                path: self.path.clone(),
                source,
            })
    }
}

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("No transcript available for episode '{0}'")]
    Unavailable(String),

    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Transcription failed for episode '{episode}': {reason}")]
    TranscriptionFailed { episode: String, reason: String },

    #[error("Failed to read transcript {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Produces transcripts (download plus speech-to-text live behind this trait).
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch_transcript(
        &self,
        episode: &EpisodeRef,
    ) -> Result<TranscriptHandle, TranscriptError>;
}

/// Transcripts already present as `<dir>/<episode id>.txt`.
#[derive(Debug, Clone)]
pub struct DirectoryTranscripts {
    dir: PathBuf,
}

impl DirectoryTranscripts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn transcript_path(&self, episode_id: &str) -> PathBuf {
        self.dir.join(format!("{episode_id}.txt"))
    }
}

#[async_trait]
impl TranscriptSource for DirectoryTranscripts {
    async fn fetch_transcript(
        &self,
        episode: &EpisodeRef,
    ) -> Result<TranscriptHandle, TranscriptError> {
        let path = self.transcript_path(&episode.id);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(TranscriptHandle::new(path)),
            Ok(_) => Err(TranscriptError::Unavailable(episode.id.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TranscriptError::Unavailable(episode.id.clone()))
            }
            Err(source) => Err(TranscriptError::Read { path, source }),
        }
    }
}

//! # Podcast Indexer
//!
//! Drives the embedding stores for a podcast: description search across a
//! show's episodes and paragraph search inside an episode's transcript.
//!
//! ## Architecture
//!
//! ```text
//! FeedSource ──> Episode list ──> description store (one per show)
//!                                    └─> search_episodes ──> Episode
//!
//! TranscriptSource ──> transcript ──> ParagraphSplitter
//!                                    └─> paragraph store (one per episode)
//!                                           └─> search_paragraphs
//! ```
//!
//! Feed parsing, audio download and speech-to-text stay behind the
//! [`FeedSource`] and [`TranscriptSource`] traits.

mod error;
mod feed;
mod podcast;
mod splitter;
mod transcript;

pub use error::{PodcastError, Result};
pub use feed::{Episode, FeedSource, StaticFeed};
pub use podcast::{EpisodeHit, EpisodeSearch, Podcast, UpdateReport};
pub use splitter::{
    ParagraphSplitter, SplitterConfig, TextSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};
pub use transcript::{
    DirectoryTranscripts, EpisodeRef, TranscriptError, TranscriptHandle, TranscriptSource,
};

//! # Podcast Vector Store
//!
//! Persistent, incrementally updated embedding stores for podcast search.
//!
//! ## Features
//!
//! - **One store per entity**: description stores per podcast, paragraph stores per episode
//! - **Dedup on append**: texts already indexed are never embedded twice
//! - **Crash-safe persistence**: records are written to a temp file and renamed
//! - **Single writer per store**: in-process mutex plus an advisory file lock
//! - **Match back to items**: query hits resolve to feed items by id or description
//!
//! ## Architecture
//!
//! ```text
//! (kind, name)
//!     │
//!     ├──> EmbeddingStoreManager
//!     │      ├─> load_or_create ──> StoreMetadata { texts, VectorIndex }
//!     │      └─> append (dedup) ──> embed ──> temp file ──> rename
//!     │
//!     └──> DescriptionMatcher
//!            └─> query top-k ──> payload ──> Item
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use podcast_vector_store::{
//!     ContentKind, EmbeddingStoreManager, HashingEmbedder, StoreConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoreConfig::with_root("embedding_store");
//!     let manager = EmbeddingStoreManager::new(&config, Arc::new(HashingEmbedder::default()));
//!
//!     let store = manager
//!         .load_or_create("My Show", ContentKind::Description, Vec::<String>::new())
//!         .await?;
//!     let store = manager
//!         .append(&store, ["Episode about cats", "Episode about dogs"])
//!         .await?;
//!
//!     for hit in manager.query(&store, "cats", 1).await? {
//!         println!("{}: {:.3}", hit.text, hit.score);
//!     }
//!     Ok(())
//! }
//! ```

mod atomic_write;
mod config;
mod embeddings;
mod error;
mod ledger;
mod manager;
mod matcher;
mod paths;
mod record;
mod slug;
mod store_lock;
mod types;
mod vector_index;

pub use config::{StoreConfig, DEFAULT_STORE_ROOT, STORE_ROOT_ENV};
pub use embeddings::{
    cosine_similarity, EmbeddingProvider, HashingEmbedder, DEFAULT_HASHING_DIMENSION,
};
pub use error::{Result, VectorStoreError};
pub use ledger::{StoreLedger, STORE_LEDGER_SCHEMA_VERSION};
pub use manager::{AppendOutcome, EmbeddingStoreManager};
pub use matcher::{DescriptionMatcher, DescriptionMatches, MatchedItem, StaleMatch, StaleReason};
pub use paths::{temp_path_for, StoreLayout, LEDGER_FILE_NAME};
pub use record::{StoreMetadata, STORE_RECORD_SCHEMA_VERSION};
pub use slug::slugify;
pub use types::{
    is_placeholder, ContentKind, IndexedText, MatchableItem, ScoredPayload, PLACEHOLDER_TEXT,
};
pub use vector_index::{SeedPolicy, VectorIndex};

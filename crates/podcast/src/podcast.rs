use crate::error::{PodcastError, Result};
use crate::feed::{Episode, FeedSource};
use crate::splitter::{ParagraphSplitter, TextSplitter};
use crate::transcript::{EpisodeRef, TranscriptSource};
use podcast_vector_store::{
    slugify, ContentKind, EmbeddingStoreManager, IndexedText, MatchableItem, ScoredPayload,
    StaleMatch, StoreMetadata,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one embedding update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// Store that was updated
    pub store_name: String,

    pub content_kind: ContentKind,

    /// Entries embedded by this update
    pub added: usize,

    /// Content entries in the store afterwards
    pub total: usize,

    /// True when the store already had content and nothing was fetched
    pub skipped: bool,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl UpdateReport {
    fn new(store: &StoreMetadata, added: usize, skipped: bool, started: Instant) -> Self {
        Self {
            store_name: store.store_name().to_string(),
            content_kind: store.content_kind(),
            added,
            total: store.content_len(),
            skipped,
            time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EpisodeHit {
    pub episode: Episode,
    pub score: f32,
}

/// Episodes matching a query, plus hits whose episode no longer resolves.
#[derive(Debug, Clone, Default)]
pub struct EpisodeSearch {
    pub hits: Vec<EpisodeHit>,
    pub stale: Vec<StaleMatch>,
}

impl EpisodeSearch {
    pub fn episodes(&self) -> impl Iterator<Item = &Episode> + '_ {
        self.hits.iter().map(|hit| &hit.episode)
    }
}

/// One show: its feed, its transcripts, and the stores built from them.
pub struct Podcast {
    name: String,
    store_name: String,
    manager: Arc<EmbeddingStoreManager>,
    feed: Arc<dyn FeedSource>,
    transcripts: Arc<dyn TranscriptSource>,
    splitter: Arc<dyn TextSplitter>,
}

impl Podcast {
    pub fn new(
        name: impl Into<String>,
        manager: Arc<EmbeddingStoreManager>,
        feed: Arc<dyn FeedSource>,
        transcripts: Arc<dyn TranscriptSource>,
    ) -> Result<Self> {
        let name = name.into();
        let store_name = slugify(&name);
        if store_name.is_empty() {
            return Err(PodcastError::InvalidConfig(format!(
                "podcast name {name:?} has no usable characters"
            )));
        }
        Ok(Self {
            name,
            store_name,
            manager,
            feed,
            transcripts,
            splitter: Arc::new(ParagraphSplitter::default()),
        })
    }

    #[must_use]
    pub fn with_splitter(mut self, splitter: Arc<dyn TextSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description store name for this show.
    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Paragraph store name for one of this show's episodes.
    #[must_use]
    pub fn paragraph_store_name(&self, episode: &Episode) -> String {
        slugify(&format!("{} {}", self.name, episode.title))
    }

    pub async fn episodes(&self) -> Result<Vec<Episode>> {
        self.feed.episodes().await.map_err(PodcastError::FeedError)
    }

    /// Embeds every feed description not yet in the show's description store.
    pub async fn update_description_embeddings(&self) -> Result<UpdateReport> {
        let started = Instant::now();
        let episodes = self.episodes().await?;
        let store = self
            .manager
            .load_or_create(&self.store_name, ContentKind::Description, Vec::<String>::new())
            .await?;

        let entries = episodes
            .iter()
            .filter(|e| !e.description.trim().is_empty())
            .map(|e| IndexedText::with_source(e.description.clone(), e.item_id()));
        let outcome = self.manager.append_counted(&store, entries).await?;

        log::info!(
            "Description store '{}': {} new of {} episodes",
            self.store_name,
            outcome.added,
            episodes.len()
        );
        Ok(UpdateReport::new(&outcome.store, outcome.added, false, started))
    }

    /// Up to `k` episodes whose descriptions best match `query`. A show whose
    /// descriptions were never indexed has no hits.
    pub async fn search_episodes(&self, query: &str, k: usize) -> Result<EpisodeSearch> {
        let Some(store) = self
            .manager
            .open(&self.store_name, ContentKind::Description)
            .await?
        else {
            return Ok(EpisodeSearch::default());
        };
        let episodes = self.episodes().await?;

        let matches = self
            .manager
            .matcher()
            .match_items(query, &episodes, &store, k)
            .await?;
        Ok(EpisodeSearch {
            hits: matches
                .matched
                .iter()
                .map(|m| EpisodeHit {
                    episode: m.item.clone(),
                    score: m.score,
                })
                .collect(),
            stale: matches.stale,
        })
    }

    /// Indexes the transcript paragraphs of `episode`.
    ///
    /// An episode whose paragraph store already has content is skipped without
    /// touching the transcript source. The store is only created once a
    /// transcript was obtained.
    pub async fn update_paragraph_embeddings(&self, episode: &Episode) -> Result<UpdateReport> {
        let started = Instant::now();
        let store_name = self.paragraph_store_name(episode);

        let existing = self
            .manager
            .open(&store_name, ContentKind::Paragraph)
            .await?;
        if let Some(store) = existing.as_ref().filter(|s| s.content_len() > 0) {
            log::debug!("Paragraph store '{store_name}' already indexed");
            return Ok(UpdateReport::new(store, 0, true, started));
        }

        let chunks = self.transcript_paragraphs(episode).await?;
        let base = match existing {
            Some(store) => store,
            None => {
                self.manager
                    .load_or_create(&store_name, ContentKind::Paragraph, Vec::<String>::new())
                    .await?
            }
        };
        let outcome = self.manager.append_counted(&base, chunks).await?;

        log::info!(
            "Paragraph store '{store_name}': indexed {} paragraphs",
            outcome.added
        );
        Ok(UpdateReport::new(&outcome.store, outcome.added, false, started))
    }

    /// Up to `k` transcript paragraphs of `episode` closest to `query`. An
    /// episode that was never indexed has no hits.
    pub async fn search_paragraphs(
        &self,
        episode: &Episode,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredPayload>> {
        let store = self
            .manager
            .open(&self.paragraph_store_name(episode), ContentKind::Paragraph)
            .await?;
        match store {
            Some(store) => Ok(self.manager.query(&store, query, k).await?),
            None => Ok(Vec::new()),
        }
    }

    async fn transcript_paragraphs(&self, episode: &Episode) -> Result<Vec<String>> {
        let reference = EpisodeRef {
            id: slugify(&episode.title),
            source_url: episode.url.clone(),
        };
        let handle = self.transcripts.fetch_transcript(&reference).await?;
        let text = handle.read_text().await?;
        let chunks = self.splitter.split(&text);
        log::debug!(
            "Split transcript {:?} into {} paragraphs",
            handle.path(),
            chunks.len()
        );
        Ok(chunks)
    }
}

use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, VectorStoreError};
use crate::record::StoreMetadata;
use crate::types::{ContentKind, MatchableItem};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a query hit could not be joined back to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// No current item carries this description (or the recorded id).
    ItemMissing,
    /// The item recorded for this payload now has a different description.
    DescriptionChanged,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemMissing => f.write_str("item missing"),
            Self::DescriptionChanged => f.write_str("description changed"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Stale match in store '{store}' ({reason}): payload {payload:?}")]
pub struct StaleMatch {
    pub store: String,
    pub payload: String,
    pub source_id: Option<String>,
    pub reason: StaleReason,
    pub score: f32,
}

#[derive(Debug)]
pub struct MatchedItem<'a, T> {
    pub item: &'a T,
    pub score: f32,
}

/// Items in relevance order plus the hits that no longer resolve.
#[derive(Debug)]
pub struct DescriptionMatches<'a, T> {
    pub matched: Vec<MatchedItem<'a, T>>,
    pub stale: Vec<StaleMatch>,
}

impl<'a, T> DescriptionMatches<'a, T> {
    pub fn items(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.matched.iter().map(|m| m.item)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }
}

/// Joins description-store hits back to feed items.
pub struct DescriptionMatcher {
    provider: Arc<dyn EmbeddingProvider>,
}

impl DescriptionMatcher {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Queries `store` for up to `k` descriptions close to `query_text` and
    /// resolves each to an item of `items`.
    ///
    /// A payload resolves through its recorded source id when present, then by
    /// exact equality with an item's cleaned description. Payloads that resolve
    /// to nothing, or to an item whose description changed since indexing, are
    /// reported in `stale` and skipped.
    pub async fn match_items<'a, T: MatchableItem>(
        &self,
        query_text: &str,
        items: &'a [T],
        store: &StoreMetadata,
        k: usize,
    ) -> Result<DescriptionMatches<'a, T>> {
        if store.content_kind() != ContentKind::Description {
            return Err(VectorStoreError::ContentKindMismatch {
                store: store.store_name().to_string(),
                expected: ContentKind::Description,
                actual: store.content_kind(),
            });
        }

        let hits = store.query(query_text, k, self.provider.as_ref()).await?;
        log::debug!(
            "Description query {:?} on '{}' returned {} hits",
            query_text,
            store.store_name(),
            hits.len()
        );

        let mut by_id: HashMap<&str, &'a T> = HashMap::with_capacity(items.len());
        let mut by_description: HashMap<&str, &'a T> = HashMap::with_capacity(items.len());
        for item in items {
            by_id.entry(item.item_id()).or_insert(item);
            by_description
                .entry(item.cleaned_description())
                .or_insert(item);
        }

        let mut matches = DescriptionMatches {
            matched: Vec::with_capacity(hits.len()),
            stale: Vec::new(),
        };
        for hit in hits {
            let source_id = store.source_id(&hit.text);
            let resolved = match source_id.and_then(|id| by_id.get(id)) {
                Some(item) if item.cleaned_description() == hit.text => Ok(*item),
                Some(_) => Err(StaleReason::DescriptionChanged),
                None => by_description
                    .get(hit.text.as_str())
                    .copied()
                    .ok_or(StaleReason::ItemMissing),
            };

            match resolved {
                Ok(item) => matches.matched.push(MatchedItem {
                    item,
                    score: hit.score,
                }),
                Err(reason) => {
                    let stale = StaleMatch {
                        store: store.store_name().to_string(),
                        payload: hit.text,
                        source_id: source_id.map(ToString::to_string),
                        reason,
                        score: hit.score,
                    };
                    log::warn!("{stale}");
                    matches.stale.push(stale);
                }
            }
        }
        Ok(matches)
    }
}

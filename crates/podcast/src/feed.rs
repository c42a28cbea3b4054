use async_trait::async_trait;
use podcast_vector_store::MatchableItem;
use serde::{Deserialize, Serialize};

/// One feed item with its description already cleaned of markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub description: String,
}

impl Episode {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            guid: None,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }
}

impl MatchableItem for Episode {
    fn item_id(&self) -> &str {
        self.guid.as_deref().unwrap_or(&self.url)
    }

    fn cleaned_description(&self) -> &str {
        &self.description
    }
}

/// Supplies the current episodes of a podcast (RSS fetch and HTML cleanup
/// live behind this trait).
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn episodes(&self) -> anyhow::Result<Vec<Episode>>;
}

/// Fixed episode list, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    episodes: Vec<Episode>,
}

impl StaticFeed {
    #[must_use]
    pub const fn new(episodes: Vec<Episode>) -> Self {
        Self { episodes }
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn episodes(&self) -> anyhow::Result<Vec<Episode>> {
        Ok(self.episodes.clone())
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved payload used to seed a store that has no real content yet.
///
/// It is never appended as content and never returned from a query.
pub const PLACEHOLDER_TEXT: &str = "";

#[must_use]
pub fn is_placeholder(text: &str) -> bool {
    text == PLACEHOLDER_TEXT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// One store per podcast, one entry per episode description.
    Description,
    /// One store per episode, one entry per transcript chunk.
    Paragraph,
}

impl ContentKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Paragraph => "paragraph",
        }
    }

    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Description => "description_embeddings",
            Self::Paragraph => "paragraph_embeddings",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text submitted for indexing, optionally tagged with the identifier of the
/// item it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedText {
    pub text: String,
    pub source_id: Option<String>,
}

impl IndexedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: None,
        }
    }

    pub fn with_source(text: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: Some(source_id.into()),
        }
    }
}

impl From<String> for IndexedText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for IndexedText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<&String> for IndexedText {
    fn from(text: &String) -> Self {
        Self::new(text.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPayload {
    pub text: String,
    pub score: f32,
    /// Position of the entry in insertion order.
    pub position: usize,
}

/// Anything a description store can be joined back to.
pub trait MatchableItem {
    /// Stable identifier (feed guid or URL).
    fn item_id(&self) -> &str;

    /// Cleaned description exactly as it was submitted for indexing.
    fn cleaned_description(&self) -> &str;
}

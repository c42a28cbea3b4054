use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_CHUNK_SIZE: usize = 400;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Paragraph chunking limits, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Maximum chunk length
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl SplitterConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }

        Ok(())
    }
}

pub trait TextSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Recursive splitter: tries paragraph breaks, then line breaks, then spaces,
/// then grapheme clusters, and merges the pieces back into chunks of at most
/// `chunk_size` characters with up to `chunk_overlap` characters repeated.
#[derive(Debug, Clone)]
pub struct ParagraphSplitter {
    config: SplitterConfig,
}

impl ParagraphSplitter {
    pub fn new(config: SplitterConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &SplitterConfig {
        &self.config
    }

    fn split_recursive(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.graphemes(true).collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) <= self.config.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let sep_len = char_len(separator);

        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;
        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { sep_len };
            if total + len + joiner > size && !window.is_empty() {
                push_chunk(&mut chunks, &window, separator);
                // Keep a tail of the window as overlap for the next chunk.
                while let Some(first) = window.front() {
                    if total <= overlap && total + len + sep_len <= size {
                        break;
                    }
                    let dropped = char_len(first) + if window.len() > 1 { sep_len } else { 0 };
                    total = total.saturating_sub(dropped);
                    window.pop_front();
                }
            }
            window.push_back(piece);
            total += len + if window.len() > 1 { sep_len } else { 0 };
        }
        push_chunk(&mut chunks, &window, separator);
        chunks
    }
}

impl Default for ParagraphSplitter {
    fn default() -> Self {
        Self {
            config: SplitterConfig::default(),
        }
    }
}

impl TextSplitter for ParagraphSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }
}

fn push_chunk(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    if window.is_empty() {
        return;
    }
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    if !joined.trim().is_empty() {
        chunks.push(joined);
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

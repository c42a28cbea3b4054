use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_HASHING_DIMENSION: usize = 384;

/// Turns text into vectors. Implementations must be deterministic for a given
/// `model_id`: stores persisted under one id are only ever reopened with a
/// provider reporting the same id.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Embeds every text, preserving input order. Either all texts are embedded
    /// or an error is returned.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))
    }
}

/// Deterministic bag-of-words embedder based on feature hashing.
///
/// Each lowercase word contributes a pseudo-random unit direction derived from
/// its hash, so texts sharing words land close together. Useful for
/// development, offline runs and tests; it has no notion of synonyms.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    model_id: String,
    dimension: usize,
}

impl HashingEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            model_id: format!("hashing-v1-{dimension}"),
            dimension,
        }
    }

    pub fn with_model_id(model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut acc = vec![0.0f32; self.dimension];
        for word in text.unicode_words() {
            let token = word.to_lowercase();
            let mut state = fnv1a_64(token.as_bytes())
                ^ (self.dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            for slot in &mut acc {
                let bits = splitmix64(&mut state);
                let high = (bits >> 32) as u32;
                let mantissa = high >> 9;
                let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
                *slot += unit.mul_add(2.0, -1.0);
            }
        }
        normalize(&mut acc);
        acc
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

pub(crate) fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

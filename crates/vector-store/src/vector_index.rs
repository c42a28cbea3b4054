use crate::embeddings::{cosine_similarity, EmbeddingProvider};
use crate::error::{Result, VectorStoreError};
use crate::types::{ScoredPayload, PLACEHOLDER_TEXT};
use serde::{Deserialize, Serialize};

/// What `create` does when handed zero texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Refuse with `EmptyInput`.
    Strict,
    /// Seed the index with the reserved placeholder text.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IndexEntry {
    payload: String,
    vector: Vec<f32>,
}

/// Brute-force cosine index over (vector, payload) pairs kept in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    pub async fn create<S: AsRef<str> + Sync>(
        texts: &[S],
        provider: &dyn EmbeddingProvider,
        policy: SeedPolicy,
    ) -> Result<Self> {
        let mut index = Self::new(provider.dimension());
        if texts.is_empty() {
            return match policy {
                SeedPolicy::Strict => Err(VectorStoreError::EmptyInput),
                SeedPolicy::Placeholder => {
                    index.add(&[PLACEHOLDER_TEXT], provider).await?;
                    Ok(index)
                }
            };
        }
        index.add(texts, provider).await?;
        Ok(index)
    }

    /// Embed and append. Existing vectors are never touched, and nothing is
    /// appended unless every text embedded successfully.
    pub async fn add<S: AsRef<str> + Sync>(
        &mut self,
        texts: &[S],
        provider: &dyn EmbeddingProvider,
    ) -> Result<()> {
        if texts.is_empty() {
            return Ok(());
        }
        let refs: Vec<&str> = texts.iter().map(AsRef::as_ref).collect();
        let vectors = provider.embed_batch(&refs).await?;
        if vectors.len() != refs.len() {
            return Err(VectorStoreError::EmbeddingError(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                refs.len()
            )));
        }
        self.push_embedded(refs.into_iter().map(ToString::to_string).collect(), vectors)
    }

    fn push_embedded(&mut self, payloads: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        self.entries.extend(
            payloads
                .into_iter()
                .zip(vectors)
                .map(|(payload, vector)| IndexEntry { payload, vector }),
        );
        Ok(())
    }

    pub async fn query(
        &self,
        text: &str,
        k: usize,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Vec<ScoredPayload>> {
        if k == 0 {
            return Err(VectorStoreError::InvalidK);
        }
        let vector = provider.embed(text).await?;
        self.search_vector(&vector, k)
    }

    /// Top-k payloads by cosine similarity, best first. Ties keep insertion order.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPayload>> {
        self.search_where(query, k, |_| true)
    }

    pub(crate) fn search_where<F>(
        &self,
        query: &[f32],
        k: usize,
        keep: F,
    ) -> Result<Vec<ScoredPayload>>
    where
        F: Fn(&str) -> bool,
    {
        if k == 0 {
            return Err(VectorStoreError::InvalidK);
        }
        if query.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scores: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| keep(&entry.payload))
            .map(|(pos, entry)| (pos, cosine_similarity(query, &entry.vector)))
            .collect();

        // `sort_by` is stable, so equal scores stay in insertion order.
        // NaN scores sink to the bottom.
        let rank = |score: f32| if score.is_nan() { f32::NEG_INFINITY } else { score };
        scores.sort_by(|a, b| rank(b.1).total_cmp(&rank(a.1)));
        scores.truncate(k);

        Ok(scores
            .into_iter()
            .map(|(position, score)| ScoredPayload {
                text: self.entries[position].payload.clone(),
                score,
                position,
            })
            .collect())
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn payloads(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.payload.as_str())
    }

    #[must_use]
    pub fn payload(&self, position: usize) -> Option<&str> {
        self.entries.get(position).map(|entry| entry.payload.as_str())
    }

    /// Encodes the index as MessagePack (`rmp_serde`, named fields).
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Rebuilds an index from `serialize` output. The provider must produce
    /// vectors of the same dimension, otherwise later queries and appends
    /// would compare incompatible vectors.
    pub fn deserialize(bytes: &[u8], provider: &dyn EmbeddingProvider) -> Result<Self> {
        let index: Self = rmp_serde::from_slice(bytes)
            .map_err(|e| VectorStoreError::Corrupt(format!("undecodable index bytes: {e}")))?;
        if index.dimension != provider.dimension() {
            return Err(VectorStoreError::InvalidDimension {
                expected: provider.dimension(),
                actual: index.dimension,
            });
        }
        if let Some((position, entry)) = index
            .entries
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.vector.len() != index.dimension)
        {
            return Err(VectorStoreError::Corrupt(format!(
                "entry {position} has {} values, index dimension is {}",
                entry.vector.len(),
                index.dimension
            )));
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;

    #[tokio::test]
    async fn test_add_and_search() {
        let embedder = HashingEmbedder::new(3);
        let mut index = VectorIndex::new(3);
        index
            .push_embedded(
                vec!["a".into(), "b".into(), "c".into()],
                vec![vec![1.0, 0.0, 0.0], vec![0.9, 0.1, 0.0], vec![0.0, 1.0, 0.0]],
            )
            .unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search_vector(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "a");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[1].text, "b");
        assert!(results[1].score > 0.9);

        let all = index.query("anything", 10, &embedder).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = VectorIndex::new(3);
        let result = index.push_embedded(vec!["a".into()], vec![vec![1.0, 0.0]]);
        assert!(matches!(
            result,
            Err(VectorStoreError::InvalidDimension {
                expected: 3,
                actual: 2
            })
        ));
        assert!(index.is_empty());

        index
            .push_embedded(vec!["a".into()], vec![vec![1.0, 0.0, 0.0]])
            .unwrap();
        assert!(index.search_vector(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn nan_vectors_rank_last() {
        let mut index = VectorIndex::new(2);
        index
            .push_embedded(
                vec!["broken".into(), "a".into(), "b".into()],
                vec![vec![f32::NAN, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();

        let results = index.search_vector(&[1.0, 0.0], 3).unwrap();
        let texts: Vec<_> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "broken"]);
    }

    #[tokio::test]
    async fn create_rejects_empty_input_unless_placeholder_seeded() {
        let embedder = HashingEmbedder::new(8);
        let empty: [&str; 0] = [];
        let err = VectorIndex::create(&empty, &embedder, SeedPolicy::Strict)
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::EmptyInput));

        let seeded = VectorIndex::create(&empty, &embedder, SeedPolicy::Placeholder)
            .await
            .unwrap();
        assert_eq!(seeded.payloads().collect::<Vec<_>>(), vec![PLACEHOLDER_TEXT]);
    }

    #[tokio::test]
    async fn zero_k_is_rejected() {
        let embedder = HashingEmbedder::new(8);
        let index = VectorIndex::create(&["hello"], &embedder, SeedPolicy::Strict)
            .await
            .unwrap();
        assert!(matches!(
            index.query("hello", 0, &embedder).await,
            Err(VectorStoreError::InvalidK)
        ));
    }

    #[tokio::test]
    async fn add_keeps_existing_vectors() {
        let embedder = HashingEmbedder::new(16);
        let mut index = VectorIndex::create(&["first text"], &embedder, SeedPolicy::Strict)
            .await
            .unwrap();
        let before = index.entries[0].clone();
        index
            .add(&["second text", "third text"], &embedder)
            .await
            .unwrap();
        assert_eq!(index.entries[0], before);
        assert_eq!(
            index.payloads().collect::<Vec<_>>(),
            vec!["first text", "second text", "third text"]
        );
    }

    #[tokio::test]
    async fn roundtrip_answers_queries_identically() {
        let embedder = HashingEmbedder::new(24);
        let texts = [
            "hola mundo",
            "adios mundo",
            "saludos mundo",
            "podcast about cooking",
            "podcast about space travel",
        ];
        let index = VectorIndex::create(&texts, &embedder, SeedPolicy::Strict)
            .await
            .unwrap();
        let restored = VectorIndex::deserialize(&index.serialize().unwrap(), &embedder).unwrap();
        assert_eq!(restored, index);

        for query in ["hola mundo", "space", "cooking show", ""] {
            for k in 1..=6 {
                let a: Vec<String> = index
                    .query(query, k, &embedder)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|r| r.text)
                    .collect();
                let b: Vec<String> = restored
                    .query(query, k, &embedder)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|r| r.text)
                    .collect();
                assert_eq!(a, b, "query {query:?} k={k}");
            }
        }
    }

    #[tokio::test]
    async fn deserialize_rejects_corrupt_or_incompatible_bytes() {
        let embedder = HashingEmbedder::new(8);
        let index = VectorIndex::create(&["x"], &embedder, SeedPolicy::Strict)
            .await
            .unwrap();
        let bytes = index.serialize().unwrap();

        let truncated = &bytes[..bytes.len() - 3];
        assert!(matches!(
            VectorIndex::deserialize(truncated, &embedder),
            Err(VectorStoreError::Corrupt(_))
        ));

        assert!(matches!(
            VectorIndex::deserialize(b"not an index", &embedder),
            Err(VectorStoreError::Corrupt(_))
        ));

        let mut short_vector = index.clone();
        short_vector.entries[0].vector.pop();
        assert!(matches!(
            VectorIndex::deserialize(&short_vector.serialize().unwrap(), &embedder),
            Err(VectorStoreError::Corrupt(_))
        ));

        let other = HashingEmbedder::new(4);
        assert!(matches!(
            VectorIndex::deserialize(&bytes, &other),
            Err(VectorStoreError::InvalidDimension { .. })
        ));
    }
}

use crate::atomic_write::StagedWrite;
use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, VectorStoreError};
use crate::types::{is_placeholder, ContentKind, IndexedText, ScoredPayload};
use crate::vector_index::{SeedPolicy, VectorIndex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub const STORE_RECORD_SCHEMA_VERSION: u32 = 1;

/// A vector index together with the texts it was built from.
///
/// The index owns the payloads, so texts and vectors can only change together.
/// Values are immutable snapshots: appending produces a new `StoreMetadata`.
#[derive(Debug, Clone)]
pub struct StoreMetadata {
    store_name: String,
    content_kind: ContentKind,
    embedding_model_id: String,
    revision: u64,
    index: VectorIndex,
    text_set: HashSet<String>,
    source_ids: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStoreRecord {
    schema_version: u32,
    store_name: String,
    content_kind: ContentKind,
    embedding_model_id: String,
    revision: u64,
    texts: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    source_ids: BTreeMap<String, String>,
    index_sha256: String,
    #[serde(with = "base64_bytes")]
    index_bytes: Vec<u8>,
}

/// The fields needed to decide whether a record on disk is newer than a snapshot.
#[derive(Debug, Deserialize)]
pub(crate) struct RecordHeader {
    pub revision: u64,
}

impl StoreMetadata {
    /// Builds a fresh store. Seeds are deduplicated; when nothing real remains
    /// the index is seeded with the placeholder text.
    pub(crate) async fn create(
        store_name: &str,
        content_kind: ContentKind,
        seeds: Vec<IndexedText>,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        let seeds = dedup_new_entries(&HashSet::new(), seeds);
        let texts: Vec<&str> = seeds.iter().map(|e| e.text.as_str()).collect();
        let index = VectorIndex::create(&texts, provider, SeedPolicy::Placeholder).await?;
        let text_set = index.payloads().map(ToString::to_string).collect();
        let source_ids = collect_source_ids(&seeds);
        Ok(Self {
            store_name: store_name.to_string(),
            content_kind,
            embedding_model_id: provider.model_id().to_string(),
            revision: 0,
            index,
            text_set,
            source_ids,
        })
    }

    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    #[must_use]
    pub const fn content_kind(&self) -> ContentKind {
        self.content_kind
    }

    #[must_use]
    pub fn embedding_model_id(&self) -> &str {
        &self.embedding_model_id
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub const fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Indexed texts in insertion order, including the placeholder if present.
    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.payloads()
    }

    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.text_set.contains(text)
    }

    #[must_use]
    pub fn source_id(&self, text: &str) -> Option<&str> {
        self.source_ids.get(text).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of real (non-placeholder) entries.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.texts().filter(|t| !is_placeholder(t)).count()
    }

    /// Top-k real payloads for `text`. The placeholder is never returned.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Vec<ScoredPayload>> {
        if k == 0 {
            return Err(VectorStoreError::InvalidK);
        }
        self.ensure_model(provider)?;
        let vector = provider.embed(text).await?;
        self.index.search_where(&vector, k, |payload| !is_placeholder(payload))
    }

    pub(crate) fn ensure_model(&self, provider: &dyn EmbeddingProvider) -> Result<()> {
        if self.embedding_model_id != provider.model_id() {
            return Err(VectorStoreError::ModelMismatch {
                store: self.store_name.clone(),
                kind: self.content_kind,
                expected: provider.model_id().to_string(),
                found: self.embedding_model_id.clone(),
            });
        }
        Ok(())
    }

    /// Entries of `new_texts` that this store does not hold yet, first
    /// occurrence wins, placeholder dropped, order preserved.
    #[must_use]
    pub fn pending_additions(&self, new_texts: Vec<IndexedText>) -> Vec<IndexedText> {
        dedup_new_entries(&self.text_set, new_texts)
    }

    /// Returns a new snapshot with `to_add` appended. `self` is left untouched,
    /// and an embedding failure leaves nothing behind.
    pub(crate) async fn extended(
        &self,
        to_add: &[IndexedText],
        provider: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        self.ensure_model(provider)?;
        let texts: Vec<&str> = to_add.iter().map(|e| e.text.as_str()).collect();
        let mut next = self.clone();
        next.index.add(&texts, provider).await?;
        next.text_set.extend(to_add.iter().map(|entry| entry.text.clone()));
        next.source_ids.extend(collect_source_ids(to_add));
        next.revision += 1;
        Ok(next)
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let index_bytes = self.index.serialize()?;
        let record = PersistedStoreRecord {
            schema_version: STORE_RECORD_SCHEMA_VERSION,
            store_name: self.store_name.clone(),
            content_kind: self.content_kind,
            embedding_model_id: self.embedding_model_id.clone(),
            revision: self.revision,
            texts: self.texts().map(ToString::to_string).collect(),
            source_ids: self.source_ids.clone(),
            index_sha256: sha256_hex(&index_bytes),
            index_bytes,
        };
        Ok(serde_json::to_vec_pretty(&record)?)
    }

    /// Decodes a record, refusing it before touching the index when it was
    /// built by another embedding model.
    pub(crate) fn from_bytes(
        bytes: &[u8],
        store_name: &str,
        content_kind: ContentKind,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        let record: PersistedStoreRecord = serde_json::from_slice(bytes)?;
        if record.schema_version != STORE_RECORD_SCHEMA_VERSION {
            return Err(VectorStoreError::Corrupt(format!(
                "Unsupported store record schema_version {} (expected {STORE_RECORD_SCHEMA_VERSION})",
                record.schema_version
            )));
        }
        if record.store_name != store_name || record.content_kind != content_kind {
            return Err(VectorStoreError::Corrupt(format!(
                "record names {} store '{}', expected {content_kind} store '{store_name}'",
                record.content_kind, record.store_name
            )));
        }
        if record.embedding_model_id != provider.model_id() {
            return Err(VectorStoreError::ModelMismatch {
                store: record.store_name,
                kind: record.content_kind,
                expected: provider.model_id().to_string(),
                found: record.embedding_model_id,
            });
        }
        if sha256_hex(&record.index_bytes) != record.index_sha256 {
            return Err(VectorStoreError::Corrupt(format!(
                "index checksum mismatch for store '{store_name}'"
            )));
        }

        let index = VectorIndex::deserialize(&record.index_bytes, provider)?;
        let aligned = index.len() == record.texts.len()
            && index.payloads().eq(record.texts.iter().map(String::as_str));
        if !aligned {
            return Err(VectorStoreError::Corrupt(format!(
                "store '{store_name}' has {} vectors but {} texts, or they disagree",
                index.len(),
                record.texts.len()
            )));
        }
        let text_set: HashSet<String> = record.texts.into_iter().collect();
        if text_set.len() != index.len() {
            return Err(VectorStoreError::Corrupt(format!(
                "store '{store_name}' holds duplicate texts"
            )));
        }

        Ok(Self {
            store_name: record.store_name,
            content_kind: record.content_kind,
            embedding_model_id: record.embedding_model_id,
            revision: record.revision,
            index,
            text_set,
            source_ids: record.source_ids,
        })
    }

    /// Reads and decodes the record at `path`; `None` when no record exists.
    pub(crate) async fn load(
        path: &Path,
        store_name: &str,
        content_kind: ContentKind,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Option<Self>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Self::from_bytes(&bytes, store_name, content_kind, provider).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(VectorStoreError::persistence(
                store_name,
                content_kind,
                "read",
                err,
            )),
        }
    }

    /// Writes the record next to `path` without making it live.
    pub(crate) async fn stage(&self, path: &Path, fsync: bool) -> Result<StagedWrite> {
        let bytes = self.to_bytes()?;
        StagedWrite::stage(path, &bytes, fsync)
            .await
            .map_err(|err| self.persistence_error("write", err))
    }

    pub(crate) async fn save(&self, path: &Path, fsync: bool) -> Result<()> {
        self.stage(path, fsync)
            .await?
            .commit()
            .await
            .map_err(|err| self.persistence_error("replace", err))
    }

    fn persistence_error(&self, op: &'static str, err: std::io::Error) -> VectorStoreError {
        VectorStoreError::persistence(&self.store_name, self.content_kind, op, err)
    }
}

pub(crate) async fn read_record_header(
    path: &Path,
    store_name: &str,
    content_kind: ContentKind,
) -> Result<Option<RecordHeader>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(VectorStoreError::persistence(
            store_name,
            content_kind,
            "read",
            err,
        )),
    }
}

fn dedup_new_entries(existing: &HashSet<String>, entries: Vec<IndexedText>) -> Vec<IndexedText> {
    let mut seen: HashSet<String> = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            !is_placeholder(&entry.text)
                && !existing.contains(&entry.text)
                && seen.insert(entry.text.clone())
        })
        .collect()
}

fn collect_source_ids(entries: &[IndexedText]) -> BTreeMap<String, String> {
    entries
        .iter()
        .filter_map(|entry| {
            entry
                .source_id
                .as_ref()
                .map(|id| (entry.text.clone(), id.clone()))
        })
        .collect()
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::types::PLACEHOLDER_TEXT;
    use pretty_assertions::assert_eq;

    fn texts(meta: &StoreMetadata) -> Vec<String> {
        meta.texts().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn create_without_seeds_holds_only_placeholder() {
        let embedder = HashingEmbedder::new(8);
        let meta = StoreMetadata::create("show", ContentKind::Description, vec![], &embedder)
            .await
            .unwrap();
        assert_eq!(texts(&meta), vec![PLACEHOLDER_TEXT.to_string()]);
        assert_eq!(meta.content_len(), 0);
        assert!(meta.query("anything", 5, &embedder).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_dedups_seeds() {
        let embedder = HashingEmbedder::new(8);
        let seeds = vec!["a".into(), "b".into(), "a".into(), PLACEHOLDER_TEXT.into()];
        let meta = StoreMetadata::create("show", ContentKind::Description, seeds, &embedder)
            .await
            .unwrap();
        assert_eq!(texts(&meta), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn bytes_roundtrip_preserves_everything() {
        let embedder = HashingEmbedder::new(16);
        let seeds = vec![
            IndexedText::with_source("first episode", "guid-1"),
            IndexedText::new("second episode"),
        ];
        let meta = StoreMetadata::create("show", ContentKind::Description, seeds, &embedder)
            .await
            .unwrap();
        let bytes = meta.to_bytes().unwrap();
        let loaded =
            StoreMetadata::from_bytes(&bytes, "show", ContentKind::Description, &embedder)
                .unwrap();
        assert_eq!(texts(&loaded), texts(&meta));
        assert_eq!(loaded.index(), meta.index());
        assert_eq!(loaded.source_id("first episode"), Some("guid-1"));
        assert_eq!(loaded.source_id("second episode"), None);
        assert_eq!(loaded.revision(), 0);
    }

    #[tokio::test]
    async fn from_bytes_rejects_other_model_before_decoding_index() {
        let embedder = HashingEmbedder::with_model_id("m1", 8);
        let meta = StoreMetadata::create("show", ContentKind::Paragraph, vec!["x".into()], &embedder)
            .await
            .unwrap();
        let bytes = meta.to_bytes().unwrap();

        // Different dimension too: the model check must fire first.
        let other = HashingEmbedder::with_model_id("m2", 4);
        let err = StoreMetadata::from_bytes(&bytes, "show", ContentKind::Paragraph, &other)
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::ModelMismatch { ref expected, ref found, .. }
                if expected == "m2" && found == "m1"
        ));
    }

    #[tokio::test]
    async fn from_bytes_detects_tampering() {
        let embedder = HashingEmbedder::new(8);
        let meta = StoreMetadata::create("show", ContentKind::Description, vec!["x".into()], &embedder)
            .await
            .unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&meta.to_bytes().unwrap()).unwrap();
        value["texts"] = serde_json::json!(["x", "y"]);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            StoreMetadata::from_bytes(&bytes, "show", ContentKind::Description, &embedder),
            Err(VectorStoreError::Corrupt(_))
        ));

        let mut value: serde_json::Value = serde_json::from_slice(&meta.to_bytes().unwrap()).unwrap();
        value["index_sha256"] = serde_json::json!("00");
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            StoreMetadata::from_bytes(&bytes, "show", ContentKind::Description, &embedder),
            Err(VectorStoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn extended_leaves_original_snapshot_untouched() {
        let embedder = HashingEmbedder::new(8);
        let meta = StoreMetadata::create("show", ContentKind::Description, vec!["a".into()], &embedder)
            .await
            .unwrap();
        let to_add = meta.pending_additions(vec!["a".into(), "b".into(), "c".into(), "b".into()]);
        assert_eq!(
            to_add.iter().map(|e| e.text.as_str()).collect::<Vec<_>>(),
            vec!["b", "c"]
        );
        let next = meta.extended(&to_add, &embedder).await.unwrap();
        assert_eq!(texts(&meta), vec!["a".to_string()]);
        assert_eq!(
            texts(&next),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(next.revision(), 1);
        assert!(next.contains("c"));
        assert!(!meta.contains("c"));
    }
}

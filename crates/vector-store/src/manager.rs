use crate::config::StoreConfig;
use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, VectorStoreError};
use crate::ledger::StoreLedger;
use crate::matcher::DescriptionMatcher;
use crate::paths::{temp_path_for, StoreLayout};
use crate::record::{read_record_header, StoreMetadata};
use crate::slug::slugify;
use crate::store_lock::acquire_store_lock;
use crate::types::{ContentKind, IndexedText, ScoredPayload};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

type StoreKey = (ContentKind, String);

/// Per-store coordination: one writer at a time, readers share the last
/// committed snapshot.
#[derive(Default)]
struct StoreSlot {
    writer: tokio::sync::Mutex<()>,
    current: RwLock<Option<Arc<StoreMetadata>>>,
}

impl StoreSlot {
    fn current(&self) -> Option<Arc<StoreMetadata>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, meta: Arc<StoreMetadata>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(meta);
    }
}

/// Result of [`EmbeddingStoreManager::append_counted`].
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    /// Committed store after the append.
    pub store: Arc<StoreMetadata>,
    /// Entries embedded by this call.
    pub added: usize,
}

/// Creates, loads, extends and persists named embedding stores.
///
/// Every read-modify-persist sequence on a store runs under that store's
/// in-process writer lock and its advisory file lock. Stores with different
/// names never contend.
pub struct EmbeddingStoreManager {
    layout: StoreLayout,
    fsync: bool,
    provider: Arc<dyn EmbeddingProvider>,
    slots: Mutex<HashMap<StoreKey, Arc<StoreSlot>>>,
}

impl EmbeddingStoreManager {
    pub fn new(config: &StoreConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        log::info!(
            "Initializing EmbeddingStoreManager at {:?} (model '{}')",
            config.root,
            provider.model_id()
        );
        Self {
            layout: config.layout(),
            fsync: config.fsync,
            provider,
            slots: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    #[must_use]
    pub const fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    #[must_use]
    pub fn matcher(&self) -> DescriptionMatcher {
        DescriptionMatcher::new(self.provider.clone())
    }

    fn slot(&self, kind: ContentKind, store_name: &str) -> Arc<StoreSlot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry((kind, store_name.to_string()))
            .or_default()
            .clone()
    }

    /// Opens the store `name` of `kind`, creating and persisting it when no
    /// record exists. `name` is slugified first.
    ///
    /// A new store is seeded with `seed_texts` (deduplicated) or, when there are
    /// none, with the placeholder text.
    pub async fn load_or_create<I, T>(
        &self,
        name: &str,
        kind: ContentKind,
        seed_texts: I,
    ) -> Result<Arc<StoreMetadata>>
    where
        I: IntoIterator<Item = T>,
        T: Into<IndexedText>,
    {
        let store_name = store_name_for(name)?;
        let seeds: Vec<IndexedText> = seed_texts.into_iter().map(Into::into).collect();

        let slot = self.slot(kind, &store_name);
        let _writer = slot.writer.lock().await;
        let _file_lock = acquire_store_lock(
            self.layout.lock_path(kind, &store_name),
            &store_name,
            kind,
        )
        .await?;

        let path = self.layout.record_path(kind, &store_name);
        if let Some(meta) = self.load_existing(&slot, &path, &store_name, kind).await? {
            return Ok(meta);
        }

        let meta =
            StoreMetadata::create(&store_name, kind, seeds, self.provider.as_ref()).await?;
        meta.save(&path, self.fsync).await?;
        self.register_in_ledger(kind, &store_name).await?;
        log::info!(
            "Created {kind} store '{store_name}' with {} real entries",
            meta.content_len()
        );

        let meta = Arc::new(meta);
        slot.publish(meta.clone());
        Ok(meta)
    }

    /// Opens the store `name` of `kind` if a record exists. Never creates one.
    pub async fn open(&self, name: &str, kind: ContentKind) -> Result<Option<Arc<StoreMetadata>>> {
        let store_name = store_name_for(name)?;
        let slot = self.slot(kind, &store_name);
        let _writer = slot.writer.lock().await;
        let _file_lock = acquire_store_lock(
            self.layout.lock_path(kind, &store_name),
            &store_name,
            kind,
        )
        .await?;

        let path = self.layout.record_path(kind, &store_name);
        self.load_existing(&slot, &path, &store_name, kind).await
    }

    /// Committed record for the store, from this manager's snapshot when it is
    /// still current, otherwise from disk. Caller holds both store locks.
    async fn load_existing(
        &self,
        slot: &StoreSlot,
        path: &Path,
        store_name: &str,
        kind: ContentKind,
    ) -> Result<Option<Arc<StoreMetadata>>> {
        discard_leftover_temp(path).await;

        if let Some(cached) = slot.current() {
            let on_disk = read_record_header(path, store_name, kind).await?;
            if on_disk.map(|h| h.revision) == Some(cached.revision()) {
                self.register_in_ledger(kind, store_name).await?;
                return Ok(Some(cached));
            }
        }

        let Some(meta) =
            StoreMetadata::load(path, store_name, kind, self.provider.as_ref()).await?
        else {
            return Ok(None);
        };
        log::info!(
            "Loaded {kind} store '{store_name}' ({} entries, revision {})",
            meta.len(),
            meta.revision()
        );
        let meta = Arc::new(meta);
        self.register_in_ledger(kind, store_name).await?;
        slot.publish(meta.clone());
        Ok(Some(meta))
    }

    /// Appends the texts not yet present in the store and persists the result.
    ///
    /// Texts already indexed (or repeated within `new_texts`) are skipped
    /// silently; when nothing remains the call is a no-op. If the committed
    /// store is newer than `metadata`, the append is applied on top of the
    /// committed state so no earlier entry is lost. Nothing is committed if
    /// embedding or writing fails.
    pub async fn append<I, T>(
        &self,
        metadata: &StoreMetadata,
        new_texts: I,
    ) -> Result<Arc<StoreMetadata>>
    where
        I: IntoIterator<Item = T>,
        T: Into<IndexedText>,
    {
        Ok(self.append_counted(metadata, new_texts).await?.store)
    }

    /// Same as [`append`](Self::append), also reporting how many entries this
    /// call embedded (entries picked up by rebasing are not counted).
    pub async fn append_counted<I, T>(
        &self,
        metadata: &StoreMetadata,
        new_texts: I,
    ) -> Result<AppendOutcome>
    where
        I: IntoIterator<Item = T>,
        T: Into<IndexedText>,
    {
        metadata.ensure_model(self.provider.as_ref())?;
        let new_texts: Vec<IndexedText> = new_texts.into_iter().map(Into::into).collect();
        let kind = metadata.content_kind();
        let store_name = metadata.store_name().to_string();

        let slot = self.slot(kind, &store_name);
        let _writer = slot.writer.lock().await;
        let _file_lock = acquire_store_lock(
            self.layout.lock_path(kind, &store_name),
            &store_name,
            kind,
        )
        .await?;

        let path = self.layout.record_path(kind, &store_name);
        let base = self.latest_committed(&slot, metadata, &path).await?;

        let to_add = base.pending_additions(new_texts);
        if to_add.is_empty() {
            log::debug!("Nothing new for {kind} store '{store_name}'");
            slot.publish(base.clone());
            return Ok(AppendOutcome {
                store: base,
                added: 0,
            });
        }

        let next = base.extended(&to_add, self.provider.as_ref()).await?;
        next.save(&path, self.fsync).await?;
        log::info!(
            "Appended {} entries to {kind} store '{store_name}' (total {}, revision {})",
            to_add.len(),
            next.len(),
            next.revision()
        );

        let next = Arc::new(next);
        slot.publish(next.clone());
        Ok(AppendOutcome {
            store: next,
            added: to_add.len(),
        })
    }

    /// Newest of: the caller's snapshot, this manager's snapshot, the record on
    /// disk (which another process may have advanced).
    async fn latest_committed(
        &self,
        slot: &StoreSlot,
        metadata: &StoreMetadata,
        path: &Path,
    ) -> Result<Arc<StoreMetadata>> {
        let mut base = match slot.current() {
            Some(cached) if cached.revision() >= metadata.revision() => cached,
            _ => Arc::new(metadata.clone()),
        };

        let kind = metadata.content_kind();
        let store_name = metadata.store_name();
        let on_disk = read_record_header(path, store_name, kind).await?;
        if on_disk.is_some_and(|h| h.revision > base.revision()) {
            if let Some(fresh) =
                StoreMetadata::load(path, store_name, kind, self.provider.as_ref()).await?
            {
                log::debug!(
                    "Rebasing append on {kind} store '{store_name}' from revision {} to {}",
                    base.revision(),
                    fresh.revision()
                );
                base = Arc::new(fresh);
            }
        }
        Ok(base)
    }

    /// Last snapshot committed through this manager, if the store was opened.
    #[must_use]
    pub fn snapshot(&self, name: &str, kind: ContentKind) -> Option<Arc<StoreMetadata>> {
        let store_name = slugify(name);
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(&(kind, store_name))
            .and_then(|slot| slot.current())
    }

    /// Store names recorded in the ledger for `kind`.
    pub async fn list_stores(&self, kind: ContentKind) -> Result<Vec<String>> {
        let ledger = StoreLedger::load(self.layout.ledger_path(kind), kind).await?;
        Ok(ledger.stores().map(ToString::to_string).collect())
    }

    /// Top-k payloads of `metadata` for `text`, placeholder excluded.
    pub async fn query(
        &self,
        metadata: &StoreMetadata,
        text: &str,
        k: usize,
    ) -> Result<Vec<ScoredPayload>> {
        metadata.query(text, k, self.provider.as_ref()).await
    }

    async fn register_in_ledger(&self, kind: ContentKind, store_name: &str) -> Result<()> {
        let ledger_path = self.layout.ledger_path(kind);
        let _ledger_lock =
            acquire_store_lock(self.layout.ledger_lock_path(kind), store_name, kind).await?;
        let mut ledger = StoreLedger::load(&ledger_path, kind).await?;
        if ledger.register(store_name) {
            ledger.save(&ledger_path, self.fsync).await?;
            log::debug!("Registered {kind} store '{store_name}' in ledger");
        }
        Ok(())
    }
}

fn store_name_for(name: &str) -> Result<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(VectorStoreError::InvalidStoreName(name.to_string()));
    }
    Ok(slug)
}

/// A temp file under the store lock can only be a write that never got
/// renamed; the live record is still the last complete commit.
async fn discard_leftover_temp(path: &Path) {
    let tmp = temp_path_for(path);
    if tokio::fs::metadata(&tmp).await.is_ok() {
        log::warn!("Discarding unfinished store write {}", tmp.display());
        if let Err(err) = tokio::fs::remove_file(&tmp).await {
            log::warn!("Failed to remove {}: {err}", tmp.display());
        }
    }
}

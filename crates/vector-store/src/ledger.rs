use crate::atomic_write::write_atomic;
use crate::error::{Result, VectorStoreError};
use crate::types::ContentKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

pub const STORE_LEDGER_SCHEMA_VERSION: u32 = 1;

/// Names of the stores that exist for one content kind, so callers never have
/// to scan the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLedger {
    content_kind: ContentKind,
    stores: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStoreLedger {
    schema_version: u32,
    content_kind: ContentKind,
    stores: BTreeSet<String>,
}

impl StoreLedger {
    #[must_use]
    pub const fn new(content_kind: ContentKind) -> Self {
        Self {
            content_kind,
            stores: BTreeSet::new(),
        }
    }

    /// Missing ledger reads as empty.
    pub async fn load(path: impl AsRef<Path>, content_kind: ContentKind) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::new(content_kind));
            }
            Err(err) => {
                return Err(VectorStoreError::persistence("ledger", content_kind, "read", err));
            }
        };
        let persisted: PersistedStoreLedger = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != STORE_LEDGER_SCHEMA_VERSION {
            return Err(VectorStoreError::Corrupt(format!(
                "Unsupported ledger schema_version {} (expected {STORE_LEDGER_SCHEMA_VERSION})",
                persisted.schema_version
            )));
        }
        if persisted.content_kind != content_kind {
            return Err(VectorStoreError::Corrupt(format!(
                "ledger at {} is for {} stores, expected {content_kind}",
                path.display(),
                persisted.content_kind
            )));
        }
        Ok(Self {
            content_kind,
            stores: persisted.stores,
        })
    }

    pub async fn save(&self, path: impl AsRef<Path>, fsync: bool) -> Result<()> {
        let persisted = PersistedStoreLedger {
            schema_version: STORE_LEDGER_SCHEMA_VERSION,
            content_kind: self.content_kind,
            stores: self.stores.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        write_atomic(path.as_ref(), &bytes, fsync)
            .await
            .map_err(|err| VectorStoreError::persistence("ledger", self.content_kind, "write", err))
    }

    /// Returns `true` when the name was not registered yet.
    pub fn register(&mut self, store_name: &str) -> bool {
        self.stores.insert(store_name.to_string())
    }

    #[must_use]
    pub fn contains(&self, store_name: &str) -> bool {
        self.stores.contains(store_name)
    }

    pub fn stores(&self) -> impl Iterator<Item = &str> + '_ {
        self.stores.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn ledger_roundtrip_and_kind_check() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.json");

        let missing = StoreLedger::load(&path, ContentKind::Description).await.unwrap();
        assert!(missing.is_empty());

        let mut ledger = StoreLedger::new(ContentKind::Description);
        assert!(ledger.register("b-show"));
        assert!(ledger.register("a-show"));
        assert!(!ledger.register("a-show"));
        ledger.save(&path, false).await.unwrap();

        let loaded = StoreLedger::load(&path, ContentKind::Description).await.unwrap();
        assert_eq!(loaded.stores().collect::<Vec<_>>(), vec!["a-show", "b-show"]);
        assert!(loaded.contains("b-show"));

        assert!(matches!(
            StoreLedger::load(&path, ContentKind::Paragraph).await,
            Err(VectorStoreError::Corrupt(_))
        ));
    }
}

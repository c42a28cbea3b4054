use crate::types::ContentKind;
use std::path::{Path, PathBuf};

pub const LEDGER_FILE_NAME: &str = "ledger.json";
const LEDGER_LOCK_FILE_NAME: &str = "ledger.lock";
const RECORD_PREFIX: &str = "store_";
const RECORD_EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

/// Where store records live on disk:
///
/// ```text
/// <root>/description_embeddings/ledger.json
/// <root>/description_embeddings/ledger.lock
/// <root>/description_embeddings/store_<name>.json
/// <root>/description_embeddings/store_<name>.lock
/// <root>/paragraph_embeddings/...
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn kind_dir(&self, kind: ContentKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    #[must_use]
    pub fn ledger_path(&self, kind: ContentKind) -> PathBuf {
        self.kind_dir(kind).join(LEDGER_FILE_NAME)
    }

    #[must_use]
    pub fn ledger_lock_path(&self, kind: ContentKind) -> PathBuf {
        self.kind_dir(kind).join(LEDGER_LOCK_FILE_NAME)
    }

    #[must_use]
    pub fn record_path(&self, kind: ContentKind, store_name: &str) -> PathBuf {
        self.kind_dir(kind)
            .join(format!("{RECORD_PREFIX}{store_name}.{RECORD_EXTENSION}"))
    }

    #[must_use]
    pub fn lock_path(&self, kind: ContentKind, store_name: &str) -> PathBuf {
        self.kind_dir(kind)
            .join(format!("{RECORD_PREFIX}{store_name}.{LOCK_EXTENSION}"))
    }
}

/// Sibling path used for write-then-rename.
#[must_use]
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

use crate::error::{Result, VectorStoreError};
use crate::paths::StoreLayout;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const STORE_ROOT_ENV: &str = "PODCAST_STORE_ROOT";
pub const DEFAULT_STORE_ROOT: &str = "embedding_store";

/// Configuration for where and how store records are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one sub-directory per content kind
    pub root: PathBuf,

    /// fsync temp files before they replace the live record
    pub fsync: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORE_ROOT),
            fsync: true,
        }
    }
}

impl StoreConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Defaults, overridden by `PODCAST_STORE_ROOT` when set.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Reads a TOML file such as:
    ///
    /// ```toml
    /// root = "/var/lib/podcasts/embeddings"
    /// fsync = true
    /// ```
    ///
    /// `PODCAST_STORE_ROOT` still wins over the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw).map_err(|err| {
            VectorStoreError::Other(format!("invalid store config {}: {err}", path.display()))
        })?;
        Ok(config.apply_env())
    }

    fn apply_env(mut self) -> Self {
        if let Some(root) = env::var_os(STORE_ROOT_ENV).filter(|v| !v.is_empty()) {
            self.root = PathBuf::from(root);
        }
        self
    }

    #[must_use]
    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(self.root.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_partial_toml_with_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.toml");
        std::fs::write(&path, "root = \"/srv/embeddings\"\n").unwrap();

        let config: StoreConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/embeddings"));
        assert!(config.fsync);

        std::fs::write(&path, "fsync = \"yes\"\n").unwrap();
        assert!(StoreConfig::load(&path).is_err());
    }
}

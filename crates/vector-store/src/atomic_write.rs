use crate::paths::temp_path_for;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Bytes fully written to a sibling temp file, not yet visible under the live path.
#[derive(Debug)]
pub(crate) struct StagedWrite {
    tmp: PathBuf,
    target: PathBuf,
}

impl StagedWrite {
    pub(crate) async fn stage(target: &Path, bytes: &[u8], fsync: bool) -> io::Result<Self> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = temp_path_for(target);
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        if fsync {
            file.sync_all().await?;
        }
        Ok(Self {
            tmp,
            target: target.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub(crate) fn temp_path(&self) -> &Path {
        &self.tmp
    }

    /// Atomically replaces the live file.
    pub(crate) async fn commit(self) -> io::Result<()> {
        if let Err(err) = tokio::fs::rename(&self.tmp, &self.target).await {
            if let Err(cleanup) = tokio::fs::remove_file(&self.tmp).await {
                log::warn!("Failed to remove {}: {cleanup}", self.tmp.display());
            }
            return Err(err);
        }
        Ok(())
    }
}

pub(crate) async fn write_atomic(target: &Path, bytes: &[u8], fsync: bool) -> io::Result<()> {
    StagedWrite::stage(target, bytes, fsync).await?.commit().await
}

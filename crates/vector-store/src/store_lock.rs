use crate::error::{Result, VectorStoreError};
use crate::types::ContentKind;
use fs2::FileExt;
use std::path::PathBuf;
use std::time::Instant;

/// Exclusive advisory lock on one store's record, shared with other processes.
/// Released on drop.
pub(crate) struct StoreFileLock {
    file: std::fs::File,
}

impl Drop for StoreFileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub(crate) async fn acquire_store_lock(
    path: PathBuf,
    store_name: &str,
    kind: ContentKind,
) -> Result<StoreFileLock> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| VectorStoreError::persistence(store_name, kind, "lock", err))?;
    }

    let store = store_name.to_string();
    tokio::task::spawn_blocking(move || -> Result<StoreFileLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| VectorStoreError::persistence(&store, kind, "lock", err))?;

        let start = Instant::now();
        file.lock_exclusive()
            .map_err(|err| VectorStoreError::persistence(&store, kind, "lock", err))?;
        let waited = start.elapsed();
        if waited.as_millis() > 0 {
            log::debug!(
                "Waited {}ms for {kind} store lock {}",
                waited.as_millis(),
                path.display()
            );
        }

        Ok(StoreFileLock { file })
    })
    .await
    .map_err(|err| VectorStoreError::Other(format!("join store lock task: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn second_holder_waits_for_release() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store_x.lock");

        let first = acquire_store_lock(path.clone(), "x", ContentKind::Description)
            .await
            .unwrap();

        let contender = tokio::spawn({
            let path = path.clone();
            async move { acquire_store_lock(path, "x", ContentKind::Description).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(first);
        let second = tokio::time::timeout(Duration::from_secs(5), contender)
            .await
            .expect("lock released")
            .expect("join")
            .expect("acquire");
        drop(second);
    }
}

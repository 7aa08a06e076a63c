use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::{DocumentLocks, FileStore};

/// [`FileStore`] over the local filesystem via `tokio::fs`.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader never observes a half-written document.
#[derive(Default)]
pub struct FsStore {
    locks: DocumentLocks,
}

impl FsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))?
        .to_string_lossy();
    Ok(path.with_file_name(format!(
        ".{file_name}.{}.tmp",
        Uuid::new_v4().simple()
    )))
}

#[async_trait]
impl FileStore for FsStore {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("failed to create directory {}", path.display()))
    }

    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(anyhow::Error::new(err).context(format!("failed to read {}", path.display())))
            }
        }
    }

    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent).await?;
            }
        }

        let temp_path = temp_path_for(path)?;
        if let Err(err) = tokio::fs::write(&temp_path, bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(anyhow::Error::new(err)
                .context(format!("failed to write {}", temp_path.display())));
        }

        if let Err(err) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(anyhow::Error::new(err)
                .context(format!("failed to replace {}", path.display())));
        }

        log::trace!("wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("failed to remove {}", path.display()))
    }

    async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        self.locks.acquire(path).await
    }
}

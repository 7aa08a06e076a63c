//! File access for vault documents.
//!
//! The core never touches the filesystem directly; it goes through a
//! [`FileStore`], which the host injects. [`FsStore`] is the real one.

mod fs;
mod locks;

pub use fs::FsStore;
pub use locks::DocumentLocks;

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::OwnedMutexGuard;

/// Outcome of reading a JSON document.
///
/// Loads fall back to defaults for anything but `Present`. Read-modify-write
/// callers start fresh only on `Absent` and refuse to overwrite the rest.
#[derive(Debug)]
pub enum DocumentRead<T> {
    Present(T),
    Absent,
    Malformed(anyhow::Error),
    Unreadable(anyhow::Error),
}

impl<T> DocumentRead<T> {
    /// Failure detail for malformed/unreadable outcomes.
    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            DocumentRead::Malformed(err) | DocumentRead::Unreadable(err) => Some(err),
            _ => None,
        }
    }
}

/// Narrow filesystem capability the vault core depends on.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    async fn is_dir(&self, path: &Path) -> bool;

    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Raw bytes; `Ok(None)` when the file does not exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Replaces the file at `path` in one step, creating parent directories.
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Serializes access to one document for a read-modify-write cycle.
    async fn lock(&self, path: &Path) -> OwnedMutexGuard<()>;
}

/// Reads and decodes a JSON document through `store`.
pub async fn read_json<T>(store: &dyn FileStore, path: &Path) -> DocumentRead<T>
where
    T: DeserializeOwned,
{
    let bytes = match store.read_bytes(path).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return DocumentRead::Absent,
        Err(err) => return DocumentRead::Unreadable(err),
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => DocumentRead::Present(value),
        Err(err) => DocumentRead::Malformed(
            anyhow::Error::new(err).context(format!("failed to parse {}", path.display())),
        ),
    }
}

/// Serializes the whole document first, then hands it to the store in one write.
pub async fn write_json<T>(store: &dyn FileStore, path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let serialized = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    store.write_bytes(path, serialized.as_bytes()).await
}

//! Fixed on-disk layout of a vault and its first-run defaults.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::models::{Config, Profile};
use crate::store::{write_json, FileStore};
use crate::log_info;

const ENABLE_LOGS: bool = true;

pub const CONFIG_FILE: &str = "config.json";
pub const PROFILE_FILE: &str = "profile.json";
pub const HISTORY_FILE: &str = "history.json";
pub const ACTIVE_FAST_FILE: &str = "active-fast.json";
pub const PHOTOS_DIR: &str = "photos";
pub const AVATAR_FILE: &str = "avatar.png";

/// Paths of every document inside one vault directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultLayout {
    root: PathBuf,
}

impl VaultLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn profile_path(&self) -> PathBuf {
        self.root.join(PROFILE_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    pub fn active_fast_path(&self) -> PathBuf {
        self.root.join(ACTIVE_FAST_FILE)
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.root.join(PHOTOS_DIR)
    }

    pub fn avatar_path(&self) -> PathBuf {
        self.root.join(AVATAR_FILE)
    }

    /// Resolves a stored file reference: relative ones hang off the vault root.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// A vault is valid when it is a directory holding a readable config document.
    pub async fn is_valid(&self, store: &dyn FileStore) -> bool {
        if !store.is_dir(&self.root).await {
            return false;
        }
        matches!(store.read_bytes(&self.config_path()).await, Ok(Some(_)))
    }

    /// Creates the directory and any missing default documents. Existing files
    /// are left untouched, so running it twice is harmless.
    pub async fn init(&self, store: &dyn FileStore) -> Result<()> {
        store.create_dir_all(&self.root).await?;

        let vault_path = self.root.to_string_lossy().into_owned();
        let created = [
            write_if_absent(store, &self.config_path(), &Config::for_vault(vault_path)).await?,
            write_if_absent(store, &self.profile_path(), &Profile::blank()).await?,
            write_if_absent(store, &self.history_path(), &default_history()).await?,
        ];

        if created.iter().any(|created| *created) {
            log_info!("Initialized vault documents in {}", self.root.display());
        }
        Ok(())
    }
}

/// The initial `history.json` is just `{ "fasts": [] }`.
fn default_history() -> serde_json::Value {
    serde_json::json!({ "fasts": [] })
}

async fn write_if_absent<T: Serialize + ?Sized + Sync>(
    store: &dyn FileStore,
    path: &Path,
    value: &T,
) -> Result<bool> {
    let _guard = store.lock(path).await;
    if store.exists(path).await {
        return Ok(false);
    }
    write_json(store, path, value).await?;
    Ok(true)
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::store::{read_json, write_json, DocumentRead, FileStore};
use crate::vault::VaultLayout;
use crate::log_warn;

const ENABLE_LOGS: bool = true;

const APP_DIR_NAME: &str = "help-me-fast";
const SETTINGS_FILE: &str = "settings.json";

/// `settings.json`, kept outside any vault. Keys this version does not know
/// about are carried through rewrites untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_vault_path: Option<String>,
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

/// Default location: `<platform data dir>/help-me-fast/settings.json`.
pub fn default_settings_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE))
        .ok_or_else(|| anyhow!("could not determine the user data directory"))
}

pub struct SettingsStore {
    path: PathBuf,
    store: Arc<dyn FileStore>,
}

impl SettingsStore {
    pub fn new(path: PathBuf, store: Arc<dyn FileStore>) -> Self {
        Self { path, store }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The remembered vault, if it still looks like a vault. Every failure
    /// (no settings, unreadable settings, vault gone) is simply `None`.
    pub async fn last_vault(&self) -> Option<PathBuf> {
        let settings = match read_json::<UserSettings>(self.store.as_ref(), &self.path).await {
            DocumentRead::Present(settings) => settings,
            DocumentRead::Absent => {
                log::debug!("No settings file at {}", self.path.display());
                return None;
            }
            other => {
                if let Some(err) = other.error() {
                    log::debug!("Ignoring unreadable settings: {err:#}");
                }
                return None;
            }
        };

        let raw = settings.last_vault_path.filter(|path| !path.trim().is_empty())?;
        let path = PathBuf::from(raw);
        if !VaultLayout::new(&path).is_valid(self.store.as_ref()).await {
            log::debug!("Remembered vault {} is no longer valid", path.display());
            return None;
        }
        Some(path)
    }

    /// Merges `lastVaultPath` into the settings document and rewrites it.
    pub async fn set_last_vault(&self, path: &str) -> Result<()> {
        let _guard = self.store.lock(&self.path).await;

        let mut settings = match read_json::<UserSettings>(self.store.as_ref(), &self.path).await {
            DocumentRead::Present(settings) => settings,
            DocumentRead::Absent => UserSettings::default(),
            other => {
                if let Some(err) = other.error() {
                    log_warn!("Rewriting unreadable settings file: {err:#}");
                }
                UserSettings::default()
            }
        };

        settings.last_vault_path = Some(path.to_string());
        write_json(self.store.as_ref(), &self.path, &settings).await
    }

    /// Forgets the remembered vault (disconnect).
    pub async fn clear_last_vault(&self) -> Result<()> {
        self.set_last_vault("").await
    }
}

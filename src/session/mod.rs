//! The open vault: loads its documents into [`AppState`], writes changes
//! back, and owns the fasting timer for that vault.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::avatar::AvatarResolver;
use crate::host::HostDialogs;
use crate::inline_image::{is_inline, InlineImage};
use crate::journal::Journal;
use crate::metabolism;
use crate::models::{
    ActiveFast, Config, FastEntry, History, NewProgressEntry, Profile, ProgressEntry,
    ProgressEntryView,
};
use crate::settings::SettingsStore;
use crate::state::{AppAction, AppState};
use crate::store::{read_json, write_json, DocumentRead, FileStore, FsStore};
use crate::timer::{Clock, FastProgress, FastState, FastTimer, SystemClock};
use crate::utils::time::from_unix_ms;
use crate::vault::VaultLayout;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

const STARTING_WEIGHT_NOTE: &str = "Starting weight (from profile)";

pub struct VaultSession {
    store: Arc<dyn FileStore>,
    settings: SettingsStore,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<AppState>>,
    journal: Journal,
    avatars: AvatarResolver,
    timer: FastTimer,
}

impl VaultSession {
    pub fn new(settings_path: PathBuf, store: Arc<dyn FileStore>, clock: Arc<dyn Clock>) -> Self {
        let state = Arc::new(Mutex::new(AppState::default()));
        Self {
            settings: SettingsStore::new(settings_path, store.clone()),
            journal: Journal::new(store.clone()),
            avatars: AvatarResolver::new(store.clone()),
            timer: FastTimer::new(state.clone(), store.clone(), clock.clone()),
            store,
            clock,
            state,
        }
    }

    /// Real filesystem and wall clock.
    pub fn with_settings(settings_path: PathBuf) -> Self {
        Self::new(settings_path, Arc::new(FsStore::new()), Arc::new(SystemClock))
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn timer(&self) -> &FastTimer {
        &self.timer
    }

    /// A copy of the current in-memory state.
    pub async fn snapshot(&self) -> AppState {
        self.state.lock().await.clone()
    }

    pub async fn vault_path(&self) -> Option<PathBuf> {
        self.state.lock().await.vault_path.clone()
    }

    /// Creates the vault directory and whichever default documents are missing.
    pub async fn init_vault(&self, path: &Path) -> Result<()> {
        VaultLayout::new(path)
            .init(self.store.as_ref())
            .await
            .with_context(|| format!("failed to initialize vault at {}", path.display()))
    }

    /// Makes `path` the open vault. Only initialization failures are errors;
    /// documents that cannot be loaded fall back to their defaults.
    pub async fn open(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.timer.stop_ticker();
        self.state.lock().await.apply(AppAction::Reset);

        self.init_vault(&path).await?;
        let layout = VaultLayout::new(path.clone());
        let store = self.store.as_ref();

        let config_path = layout.config_path();
        let profile_path = layout.profile_path();
        let history_path = layout.history_path();
        let active_fast_path = layout.active_fast_path();
        let (config, profile, history, active_fast) = tokio::join!(
            read_json::<Config>(store, &config_path),
            read_json::<Profile>(store, &profile_path),
            read_json::<History>(store, &history_path),
            read_json::<ActiveFast>(store, &active_fast_path),
        );

        let vault_str = path.to_string_lossy().into_owned();
        let config = or_fallback("config", config, || Config::for_vault(vault_str.clone()));
        let profile = self
            .with_displayable_avatar(&layout, or_fallback("profile", profile, Profile::blank))
            .await;
        let history = or_fallback("history", history, History::default);
        let active_fast = or_fallback("active fast", active_fast, ActiveFast::idle);

        {
            let mut state = self.state.lock().await;
            state.apply(AppAction::SetVaultPath(path.clone()));
            state.apply(AppAction::SetConfig(config));
            state.apply(AppAction::SetProfile(profile));
            state.apply(AppAction::SetHistory(history));
        }
        self.timer.hydrate(&active_fast).await;

        if let Err(err) = self.settings.set_last_vault(&vault_str).await {
            log_warn!("Could not remember vault {}: {err:#}", path.display());
        }

        log_info!("Opened vault {}", path.display());
        Ok(())
    }

    /// Reopens the remembered vault, if there is still a valid one.
    pub async fn auto_load(&self) -> Result<bool> {
        match self.settings.last_vault().await {
            Some(path) => {
                self.open(path).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn select_vault_folder(&self, host: &dyn HostDialogs) -> Result<Option<PathBuf>> {
        let Some(path) = host.pick_directory().await else {
            log::debug!("Vault selection cancelled");
            return Ok(None);
        };
        self.open(path.clone()).await?;
        Ok(Some(path))
    }

    /// Forgets the remembered vault and drops all in-memory state. Vault files
    /// are left alone.
    pub async fn disconnect(&self) -> Result<()> {
        self.timer.stop_ticker();
        self.state.lock().await.apply(AppAction::Reset);
        self.settings
            .clear_last_vault()
            .await
            .context("failed to forget the remembered vault")?;
        log_info!("Disconnected from vault");
        Ok(())
    }

    pub async fn save_config(&self, config: Config) -> Result<()> {
        let layout = self.require_layout().await?;
        self.write_document(&layout.config_path(), &config).await?;
        self.state.lock().await.apply(AppAction::SetConfig(config));
        Ok(())
    }

    pub async fn save_history(&self, history: History) -> Result<()> {
        let layout = self.require_layout().await?;
        self.write_document(&layout.history_path(), &history).await?;
        self.state.lock().await.apply(AppAction::SetHistory(history));
        Ok(())
    }

    /// Validates and writes the whole profile. A missing `tmb` is computed from
    /// the body metrics; an inlined avatar is moved to the avatar file first.
    /// Returns the profile as held in memory.
    pub async fn save_profile(&self, mut profile: Profile) -> Result<Profile> {
        profile.validate()?;
        let layout = self.require_layout().await?;

        if profile.tmb <= 0.0 && profile.is_complete() {
            profile.tmb = metabolism::calculate_tmb(&profile);
        }

        let mut persisted = profile.clone();
        persisted.avatar = match profile.avatar.as_deref().filter(|avatar| !avatar.is_empty()) {
            Some(avatar) => Some(self.avatars.to_persisted(&layout, avatar).await?),
            None => None,
        };
        self.write_document(&layout.profile_path(), &persisted).await?;

        let in_memory = if profile.avatar.as_deref().map_or(true, is_inline) {
            profile
        } else {
            self.with_displayable_avatar(&layout, persisted).await
        };
        self.state
            .lock()
            .await
            .apply(AppAction::SetProfile(in_memory.clone()));
        Ok(in_memory)
    }

    pub async fn load_config(&self) -> Result<Config> {
        let layout = self.require_layout().await?;
        let vault_str = layout.root().to_string_lossy().into_owned();
        let read = read_json(self.store.as_ref(), &layout.config_path()).await;
        let config = or_fallback("config", read, || Config::for_vault(vault_str));
        self.state.lock().await.apply(AppAction::SetConfig(config.clone()));
        Ok(config)
    }

    pub async fn load_profile(&self) -> Result<Profile> {
        let layout = self.require_layout().await?;
        let profile = self.load_or(&layout.profile_path(), "profile", Profile::blank).await;
        let profile = self.with_displayable_avatar(&layout, profile).await;
        self.state.lock().await.apply(AppAction::SetProfile(profile.clone()));
        Ok(profile)
    }

    pub async fn load_history(&self) -> Result<History> {
        let layout = self.require_layout().await?;
        let history = self.load_or(&layout.history_path(), "history", History::default).await;
        self.state.lock().await.apply(AppAction::SetHistory(history.clone()));
        Ok(history)
    }

    /// Rereads `active-fast.json` and hydrates the timer from it.
    pub async fn load_active_fast(&self) -> Result<ActiveFast> {
        let layout = self.require_layout().await?;
        let active_fast = self
            .load_or(&layout.active_fast_path(), "active fast", ActiveFast::idle)
            .await;
        self.timer.hydrate(&active_fast).await;
        Ok(active_fast)
    }

    /// Asks the host for an image file and returns it inlined.
    pub async fn select_image(&self, host: &dyn HostDialogs) -> Result<Option<String>> {
        let Some(path) = host.pick_image().await else {
            return Ok(None);
        };
        let bytes = self
            .store
            .read_bytes(&path)
            .await?
            .ok_or_else(|| anyhow!("image {} does not exist", path.display()))?;
        Ok(Some(InlineImage::from_bytes(bytes, Some(&path)).to_data_uri()))
    }

    /// Records the profile weight as the first journal entry when the journal
    /// is still empty.
    pub async fn seed_starting_weight(&self) -> Result<Option<ProgressEntry>> {
        let layout = self.require_layout().await?;
        let weight = {
            let state = self.state.lock().await;
            state
                .profile
                .as_ref()
                .map(|profile| profile.weight)
                .filter(|weight| weight.is_finite() && *weight > 0.0)
        };
        let Some(weight) = weight else {
            return Ok(None);
        };

        let history = self.load_or(&layout.history_path(), "history", History::default).await;
        if !history.progress_entries.is_empty() {
            return Ok(None);
        }

        let date = from_unix_ms(self.clock.now_ms())
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let entry = self
            .add_entry(NewProgressEntry {
                date,
                weight: Some(weight),
                photo_base64: None,
                notes: Some(STARTING_WEIGHT_NOTE.to_string()),
            })
            .await?;
        Ok(Some(entry))
    }

    pub async fn needs_profile_setup(&self) -> bool {
        let state = self.state.lock().await;
        state
            .profile
            .as_ref()
            .map_or(true, |profile| profile.weight <= 0.0)
    }

    pub async fn add_entry(&self, input: NewProgressEntry) -> Result<ProgressEntry> {
        let layout = self.require_layout().await?;
        let entry = self.journal.add_entry(&layout, input).await?;
        self.load_history().await?;
        Ok(entry)
    }

    pub async fn entries(&self) -> Result<Vec<ProgressEntryView>> {
        let layout = self.require_layout().await?;
        Ok(self.journal.get_all(&layout).await)
    }

    pub async fn delete_entry(&self, id: &str) -> Result<bool> {
        let layout = self.require_layout().await?;
        let removed = self.journal.delete_entry(&layout, id).await?;
        if removed {
            self.load_history().await?;
        }
        Ok(removed)
    }

    pub async fn start_fast(&self, target_hours: f64) -> Result<FastState> {
        self.timer.start_fast(target_hours).await
    }

    pub async fn end_fast(&self) -> Result<Option<FastEntry>> {
        self.timer.end_fast().await
    }

    pub async fn progress(&self) -> FastProgress {
        self.timer.snapshot().await
    }

    async fn require_layout(&self) -> Result<VaultLayout> {
        self.state
            .lock()
            .await
            .layout()
            .ok_or_else(|| anyhow!("no vault is open"))
    }

    async fn write_document<T>(&self, path: &Path, value: &T) -> Result<()>
    where
        T: serde::Serialize + Sync,
    {
        let _guard = self.store.lock(path).await;
        write_json(self.store.as_ref(), path, value).await
    }

    async fn load_or<T: DeserializeOwned>(
        &self,
        path: &Path,
        name: &str,
        fallback: impl FnOnce() -> T,
    ) -> T {
        or_fallback(name, read_json(self.store.as_ref(), path).await, fallback)
    }

    async fn with_displayable_avatar(&self, layout: &VaultLayout, mut profile: Profile) -> Profile {
        if let Some(avatar) = profile.avatar.take() {
            profile.avatar = self.avatars.to_displayable(layout, &avatar).await;
        }
        profile
    }
}

impl Drop for VaultSession {
    fn drop(&mut self) {
        self.timer.stop_ticker();
    }
}

fn or_fallback<T>(name: &str, read: DocumentRead<T>, fallback: impl FnOnce() -> T) -> T {
    match read {
        DocumentRead::Present(value) => value,
        DocumentRead::Absent => {
            log::debug!("No {name} document; using defaults");
            fallback()
        }
        DocumentRead::Malformed(err) | DocumentRead::Unreadable(err) => {
            log_warn!("Using default {name}: {err:#}");
            fallback()
        }
    }
}

use std::path::PathBuf;

use crate::models::{Config, History, Profile};
use crate::timer::FastState;
use crate::vault::VaultLayout;

/// Everything the app knows about the open vault. Owned by the session and
/// changed only through [`AppState::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub vault_path: Option<PathBuf>,
    pub config: Option<Config>,
    pub profile: Option<Profile>,
    pub history: Option<History>,
    pub current_fast: FastState,
}

#[derive(Debug, Clone)]
pub enum AppAction {
    SetVaultPath(PathBuf),
    SetConfig(Config),
    SetProfile(Profile),
    SetHistory(History),
    StartFast { start_time: i64, target_hours: f64 },
    EndFast,
    Reset,
}

impl AppState {
    pub fn apply(&mut self, action: AppAction) {
        match action {
            AppAction::SetVaultPath(path) => self.vault_path = Some(path),
            AppAction::SetConfig(config) => self.config = Some(config),
            AppAction::SetProfile(profile) => self.profile = Some(profile),
            AppAction::SetHistory(history) => self.history = Some(history),
            AppAction::StartFast {
                start_time,
                target_hours,
            } => self.current_fast = FastState::running(start_time, target_hours),
            AppAction::EndFast => self.current_fast = FastState::idle(),
            AppAction::Reset => *self = Self::default(),
        }
    }

    pub fn layout(&self) -> Option<VaultLayout> {
        self.vault_path.clone().map(VaultLayout::new)
    }

    /// Daily expenditure used for estimates; zero without a profile.
    pub fn tmb(&self) -> f64 {
        self.profile.as_ref().map_or(0.0, |profile| profile.tmb)
    }
}

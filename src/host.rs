use std::path::PathBuf;

use async_trait::async_trait;

/// Interactive capabilities the embedding shell provides. `None` means the
/// user cancelled.
#[async_trait]
pub trait HostDialogs: Send + Sync {
    async fn pick_directory(&self) -> Option<PathBuf>;

    async fn pick_image(&self) -> Option<PathBuf>;
}

/// Answers every prompt with a path fixed up front. Used by the command line,
/// where the "dialog" is an argument.
#[derive(Debug, Clone, Default)]
pub struct PresetDialogs {
    pub directory: Option<PathBuf>,
    pub image: Option<PathBuf>,
}

#[async_trait]
impl HostDialogs for PresetDialogs {
    async fn pick_directory(&self) -> Option<PathBuf> {
        self.directory.clone()
    }

    async fn pick_image(&self) -> Option<PathBuf> {
        self.image.clone()
    }
}

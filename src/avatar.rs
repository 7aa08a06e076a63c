//! The profile avatar lives in two forms: a short file reference on disk
//! (`avatar.png`) and an inlined data URI in memory. Nothing outside this
//! module branches on which one it holds.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::inline_image::{is_inline, InlineImage};
use crate::log_warn;
use crate::store::FileStore;
use crate::vault::{VaultLayout, AVATAR_FILE};

const ENABLE_LOGS: bool = true;

#[derive(Clone)]
pub struct AvatarResolver {
    store: Arc<dyn FileStore>,
}

impl AvatarResolver {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Persisted form -> displayable form. Inlined values pass through; a file
    /// reference is read and inlined. An unreadable file yields `None`.
    pub async fn to_displayable(&self, layout: &VaultLayout, persisted: &str) -> Option<String> {
        if persisted.is_empty() {
            return None;
        }
        if is_inline(persisted) {
            return Some(persisted.to_string());
        }

        let path = layout.resolve(persisted);
        match self.store.read_bytes(&path).await {
            Ok(Some(bytes)) => Some(InlineImage::from_bytes(bytes, Some(&path)).to_data_uri()),
            Ok(None) => {
                log_warn!("Avatar file {} is missing; clearing avatar", path.display());
                None
            }
            Err(err) => {
                log_warn!("Avatar file {} could not be read: {err:#}", path.display());
                None
            }
        }
    }

    /// In-memory form -> persisted form. A file reference is returned as is; an
    /// inlined image is written to the vault's avatar file first.
    pub async fn to_persisted(&self, layout: &VaultLayout, value: &str) -> Result<String> {
        if is_inline(value) {
            self.save_avatar(layout, value).await
        } else {
            Ok(value.to_string())
        }
    }

    /// Writes an inlined image over the vault's single avatar file and returns
    /// the short reference to store in `profile.json`. Malformed input is
    /// rejected before anything is written.
    pub async fn save_avatar(&self, layout: &VaultLayout, inlined: &str) -> Result<String> {
        let image = InlineImage::parse(inlined).context("invalid avatar image data")?;
        let path = layout.avatar_path();
        self.store.write_bytes(&path, image.bytes()).await?;
        log::debug!(
            "Saved avatar to {} ({} bytes)",
            path.display(),
            image.bytes().len()
        );
        Ok(AVATAR_FILE.to_string())
    }
}

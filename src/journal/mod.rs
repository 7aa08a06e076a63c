//! Progress journal: weight / photo / notes entries stored in `history.json`,
//! photos side-stored under `photos/`.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use uuid::Uuid;

use crate::inline_image::InlineImage;
use crate::models::{History, NewProgressEntry, ProgressEntry, ProgressEntryView};
use crate::store::{read_json, write_json, DocumentRead, FileStore};
use crate::vault::{VaultLayout, PHOTOS_DIR};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Clone)]
pub struct Journal {
    store: Arc<dyn FileStore>,
}

impl Journal {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Appends an entry, storing its photo (if it decodes) under `photos/`.
    /// Returns the stored entry with `photo_path` resolved.
    pub async fn add_entry(
        &self,
        layout: &VaultLayout,
        input: NewProgressEntry,
    ) -> Result<ProgressEntry> {
        let input = validate_entry(input)?;

        let history_path = layout.history_path();
        let _guard = self.store.lock(&history_path).await;
        let mut history = self.read_for_update(layout).await?;

        let photo_path = match input.photo_base64.as_deref() {
            Some(data) => self.store_photo(layout, data).await?,
            None => None,
        };

        let entry = ProgressEntry {
            id: format!("entry_{}", Uuid::new_v4()),
            date: input.date,
            weight: input.weight,
            photo_path,
            notes: input.notes,
        };

        history.progress_entries.push(entry.clone());
        history.sort_progress_entries();

        if let Err(err) = write_json(self.store.as_ref(), &history_path, &history).await {
            if let Some(photo) = entry.photo_path.as_deref() {
                let _ = self.store.remove_file(&layout.resolve(photo)).await;
            }
            return Err(err);
        }

        log_info!("Journal entry {} added", entry.id);
        Ok(entry)
    }

    /// Every entry, newest first, photos inlined. A missing or unreadable
    /// history yields an empty list; a missing photo file yields `None`.
    pub async fn get_all(&self, layout: &VaultLayout) -> Vec<ProgressEntryView> {
        let history = match read_json::<History>(self.store.as_ref(), &layout.history_path()).await
        {
            DocumentRead::Present(history) => history,
            DocumentRead::Absent => return Vec::new(),
            other => {
                if let Some(err) = other.error() {
                    log_warn!("Journal could not load history: {err:#}");
                }
                return Vec::new();
            }
        };

        let mut views = Vec::with_capacity(history.progress_entries.len());
        for entry in history.progress_entries {
            let photo_base64 = match entry.photo_path.as_deref() {
                Some(photo) => self.inline_photo(layout, photo).await,
                None => None,
            };
            views.push(ProgressEntryView {
                entry,
                photo_base64,
            });
        }

        crate::models::sort_entries_newest_first(&mut views, |view| view.entry.date.as_str());
        views
    }

    /// Removes the entry with `id` and, best-effort, its photo. Returns whether
    /// an entry was removed; an unknown id changes nothing.
    pub async fn delete_entry(&self, layout: &VaultLayout, id: &str) -> Result<bool> {
        let history_path = layout.history_path();
        let _guard = self.store.lock(&history_path).await;

        let mut history = match read_json::<History>(self.store.as_ref(), &history_path).await {
            DocumentRead::Present(history) => history,
            DocumentRead::Absent | DocumentRead::Malformed(_) => return Ok(false),
            DocumentRead::Unreadable(err) => return Err(err),
        };

        let Some(index) = history
            .progress_entries
            .iter()
            .position(|entry| entry.id == id)
        else {
            log::debug!("Journal entry {id} not found; nothing to delete");
            return Ok(false);
        };

        let removed = history.progress_entries.remove(index);
        write_json(self.store.as_ref(), &history_path, &history).await?;

        if let Some(photo) = removed.photo_path.as_deref() {
            let photo_path = layout.resolve(photo);
            if let Err(err) = self.store.remove_file(&photo_path).await {
                log::debug!("Ignoring photo cleanup failure for {id}: {err:#}");
            }
        }

        log_info!("Journal entry {id} deleted");
        Ok(true)
    }

    /// Current history for a read-modify-write. An absent document starts a
    /// fresh journal. A document that exists but cannot be read or parsed is
    /// an error: rewriting it would discard every fast and entry in it.
    async fn read_for_update(&self, layout: &VaultLayout) -> Result<History> {
        let path = layout.history_path();
        match read_json::<History>(self.store.as_ref(), &path).await {
            DocumentRead::Present(history) => Ok(history),
            DocumentRead::Absent => Ok(History::default()),
            DocumentRead::Malformed(err) | DocumentRead::Unreadable(err) => {
                log_warn!("Refusing to rewrite {}: {err:#}", path.display());
                Err(err)
            }
        }
    }

    /// Writes a decoded photo to `photos/` and returns its vault-relative path.
    /// Data that is not a recognised inline image is skipped.
    async fn store_photo(&self, layout: &VaultLayout, data: &str) -> Result<Option<String>> {
        let image = match InlineImage::parse(data) {
            Ok(image) => image,
            Err(err) => {
                log::debug!("Skipping journal photo: {err:#}");
                return Ok(None);
            }
        };

        let file_name = format!("photo_{}.{}", Uuid::new_v4().simple(), image.extension());
        let photos_dir = layout.photos_dir();
        self.store.create_dir_all(&photos_dir).await?;
        self.store
            .write_bytes(&photos_dir.join(&file_name), image.bytes())
            .await?;
        Ok(Some(format!("{PHOTOS_DIR}/{file_name}")))
    }

    async fn inline_photo(&self, layout: &VaultLayout, photo: &str) -> Option<String> {
        let path = layout.resolve(photo);
        match self.store.read_bytes(&path).await {
            Ok(Some(bytes)) => Some(InlineImage::from_bytes(bytes, Some(&path)).to_data_uri()),
            Ok(None) => None,
            Err(err) => {
                log::debug!("Photo {} unreadable: {err:#}", path.display());
                None
            }
        }
    }
}

fn validate_entry(mut input: NewProgressEntry) -> Result<NewProgressEntry> {
    input.date = input.date.trim().to_string();
    if input.date.is_empty() {
        bail!("entry date is required");
    }

    if let Some(weight) = input.weight {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(anyhow!("entry weight must be a positive number (got {weight})"));
        }
    }

    input.notes = input
        .notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty());
    input.photo_base64 = input.photo_base64.filter(|photo| !photo.trim().is_empty());

    if input.weight.is_none() && input.notes.is_none() && input.photo_base64.is_none() {
        bail!("entry needs a weight, a photo or notes");
    }
    Ok(input)
}

//! `data:image/<type>;base64,<payload>` strings, the inlined image form the
//! display layer consumes directly.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    mime: String,
    bytes: Vec<u8>,
}

/// True for values in the inlined form, regardless of whether they decode.
pub fn is_inline(value: &str) -> bool {
    value.starts_with(DATA_PREFIX)
}

impl InlineImage {
    /// Decodes a data URI. Only `image/<word>` types with a base64 payload
    /// are accepted.
    pub fn parse(value: &str) -> Result<Self> {
        let rest = value
            .strip_prefix(DATA_PREFIX)
            .ok_or_else(|| anyhow!("image data is not a data URI"))?;
        let (mime, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or_else(|| anyhow!("image data is not base64 encoded"))?;

        let subtype = mime
            .strip_prefix("image/")
            .ok_or_else(|| anyhow!("unsupported media type {mime}"))?;
        if subtype.is_empty() || !subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            bail!("unsupported image type {mime}");
        }
        if payload.is_empty() {
            bail!("image data is empty");
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .context("image data is not valid base64")?;

        Ok(Self {
            mime: mime.to_ascii_lowercase(),
            bytes,
        })
    }

    /// Wraps raw file bytes. The MIME type is sniffed from the content and only
    /// falls back to the file extension when the bytes are not a known format.
    pub fn from_bytes(bytes: Vec<u8>, path_hint: Option<&Path>) -> Self {
        let mime = image::guess_format(&bytes)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| mime_from_extension(path_hint).to_string());
        Self { mime, bytes }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File extension for storing this image (`jpeg` is shortened to `jpg`).
    pub fn extension(&self) -> &str {
        match self.mime.strip_prefix("image/").unwrap_or("png") {
            "jpeg" => "jpg",
            other => other,
        }
    }

    pub fn to_data_uri(&self) -> String {
        format!(
            "{DATA_PREFIX}{}{BASE64_MARKER}{}",
            self.mime,
            STANDARD.encode(&self.bytes)
        )
    }
}

fn mime_from_extension(path: Option<&Path>) -> &'static str {
    let ext = path
        .and_then(|path| path.extension())
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

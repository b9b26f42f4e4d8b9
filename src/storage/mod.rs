//! Object storage for uploaded images.
//!
//! Uploads are addressed by a slash-separated object key such as
//! `blog/2025/01/05/{uuid}-cover.png`. The [`ObjectStore`] trait is the seam
//! for the backing store; [`LocalObjectStore`] keeps objects on disk.

mod local;

pub use local::LocalObjectStore;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Datelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("invalid object key")]
    InvalidKey,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An object read back from the store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
    pub content_length: Option<u64>,
    pub etag: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn store(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;

    async fn fetch(&self, key: &str) -> Result<StoredObject, StorageError>;
}

lazy_static! {
    static ref UNSAFE_NAME_CHARS: Regex = Regex::new(r"[^a-z0-9.\-_]").unwrap();
    static ref HYPHEN_RUNS: Regex = Regex::new(r"-+").unwrap();
}

/// Lower-cased file name restricted to `[a-z0-9._-]`.
pub fn sanitize_file_name(name: &str) -> String {
    let name = name.trim().to_lowercase();
    let replaced = UNSAFE_NAME_CHARS.replace_all(&name, "-");
    let collapsed = HYPHEN_RUNS.replace_all(&replaced, "-").into_owned();
    if collapsed.is_empty() {
        "image".to_string()
    } else {
        collapsed
    }
}

/// Image type detected from the leading bytes, ignoring what the client claimed.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: RIFF ... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// `blog/YYYY/MM/DD/{uuid}-{stem}.{ext}` for the given upload time.
///
/// Only the stem of the client's file name is kept; the extension always
/// follows `content_type`.
pub fn build_object_key(file_name: &str, content_type: &str, now: DateTime<Utc>) -> String {
    let name = sanitize_file_name(file_name);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        Some(_) => "image",
        None => name.as_str(),
    };
    format!(
        "blog/{}/{:02}/{:02}/{}-{}.{}",
        now.year(),
        now.month(),
        now.day(),
        Uuid::new_v4(),
        stem,
        extension_for_mime(content_type)
    )
}

/// Public URL of an object: under the configured base, or served by this app.
pub fn public_url(base: Option<&str>, key: &str) -> String {
    match base.map(|b| b.trim().trim_end_matches('/')).filter(|b| !b.is_empty()) {
        Some(base) => format!("{base}/{key}"),
        None => format!("/api/uploads/{key}"),
    }
}

/// Rejects keys that could escape the store root or name hidden entries.
pub fn validate_key(key: &str) -> Result<&str, StorageError> {
    let key = key.trim();
    let unsafe_segment = key
        .split('/')
        .any(|segment| segment.is_empty() || segment.starts_with('.'));
    if key.is_empty() || unsafe_segment || key.contains('\\') || key.contains('\0') {
        return Err(StorageError::InvalidKey);
    }
    Ok(key)
}

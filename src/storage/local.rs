use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::body::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;

use super::{validate_key, ObjectStore, StorageError, StoredObject};

/// Sidecar directory holding each object's content type. Keys can never name it
/// because `validate_key` rejects dot segments.
const META_DIR: &str = ".meta";

/// Directory-backed object store; keys map to relative paths under `root`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(validate_key(key)?))
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(META_DIR).join(validate_key(key)?))
    }

    /// Content type recorded at store time, else guessed from the key.
    async fn content_type_of(&self, key: &str, path: &Path) -> Result<String, StorageError> {
        match fs::read_to_string(self.meta_path(key)?).await {
            Ok(recorded) if !recorded.trim().is_empty() => Ok(recorded.trim().to_string()),
            Ok(_) => Ok(guess_content_type(path)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(guess_content_type(path)),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, data).await?;
    Ok(())
}

fn etag_for(data: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(data))
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn store(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        write_file(&self.resolve(key)?, &data).await?;
        write_file(&self.meta_path(key)?, content_type.as_bytes()).await?;

        tracing::info!(key, content_type, size = data.len(), "object stored");
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<StoredObject, StorageError> {
        let path = self.resolve(key)?;
        let data = match fs::read(&path).await {
            Ok(data) => Bytes::from(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(err) => return Err(StorageError::Io(err)),
        };

        Ok(StoredObject {
            content_type: self.content_type_of(key, &path).await?,
            content_length: Some(data.len() as u64),
            etag: Some(etag_for(&data)),
            data,
        })
    }
}

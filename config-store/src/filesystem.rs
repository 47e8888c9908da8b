use crate::{Key, Storage, StorageError};
use async_trait::async_trait;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores every key as a file below `base_dir`, one directory per key segment.
pub struct FilesystemStorage {
    base_dir: PathBuf,
}

impl FilesystemStorage {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        FilesystemStorage {
            base_dir: base_dir.into(),
        }
    }

    /// Like [`FilesystemStorage::new`], creating `base_dir` if it is missing.
    pub async fn open<P: Into<PathBuf>>(base_dir: P) -> Result<Self, StorageError> {
        let storage = Self::new(base_dir);
        fs::create_dir_all(&storage.base_dir).await?;
        Ok(storage)
    }

    fn path_for(&self, key: &Key) -> PathBuf {
        key.parts()
            .fold(self.base_dir.clone(), |path, part| path.join(part))
    }

    fn key_for(&self, path: &Path) -> Option<Key> {
        let relative = path.strip_prefix(&self.base_dir).ok()?;
        let parts: Option<Vec<&str>> = relative.iter().map(|part| part.to_str()).collect();
        match parts {
            Some(parts) => Key::from_parts(parts).ok(),
            None => {
                tracing::warn!(path = ?path, "Skipping non UTF-8 path");
                None
            }
        }
    }
}

#[async_trait]
impl Storage for FilesystemStorage {
    async fn exists(&self, key: &Key) -> Result<bool, StorageError> {
        match fs::metadata(self.path_for(key)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, key: &Key) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.path_for(key)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &Key, content: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let bytes = content.len();
        tokio::task::spawn_blocking(move || write_atomic(&path, &content))
            .await
            .map_err(io::Error::other)??;

        tracing::debug!(key = %key, bytes, "Stored key");
        Ok(())
    }

    async fn list(&self, prefix: Option<&Key>) -> Result<Vec<Key>, StorageError> {
        let root = match prefix {
            Some(prefix) => self.path_for(prefix),
            None => self.base_dir.clone(),
        };

        let mut keys = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) if e.kind() == io::ErrorKind::NotADirectory => {
                    // The prefix itself names a file
                    keys.extend(self.key_for(&dir));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                // Skip in-flight temporary files and other hidden entries
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }

                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    keys.extend(self.key_for(&entry.path()));
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Writes `content` to a temporary file next to `path` and renames it into
/// place, so readers never see a partial file.
fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::other("storage path missing parent"))?;
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

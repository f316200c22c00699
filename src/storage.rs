//! # Output Storage
//!
//! A flat namespace of files keyed by name. The cache only needs "read if present"
//! and "create if absent"; nothing is ever modified in place.
//!
//! - [`DirStorage`]: a directory on disk. Writes land in a hidden temporary file in
//!   the same directory and are renamed into place, so readers never see a
//!   half-written image.
//! - [`MemoryStorage`]: a map behind a lock, for tests and embedding.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{RestoreError, RestoreResult};

/// Prefix for in-flight writes; never a valid fingerprint name.
const PARTIAL_PREFIX: &str = ".partial-";

/// Abstract storage for restored images.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Make sure the backing location exists and is usable.
    async fn ensure_ready(&self) -> RestoreResult<()>;

    /// Whether a file with this name exists.
    async fn exists(&self, name: &str) -> RestoreResult<bool>;

    /// Read a whole file.
    async fn read(&self, name: &str) -> RestoreResult<Vec<u8>>;

    /// Publish `bytes` under `name`. Either the full contents become visible or nothing does.
    async fn write(&self, name: &str, bytes: &[u8]) -> RestoreResult<()>;

    /// Delete a file. Missing files are not an error.
    async fn remove(&self, name: &str) -> RestoreResult<()>;

    /// Last modification time, if the file exists.
    async fn modified(&self, name: &str) -> RestoreResult<Option<SystemTime>>;

    /// Where a name lives, for reporting to the caller.
    fn locate(&self, name: &str) -> PathBuf;
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Arc<T> {
    async fn ensure_ready(&self) -> RestoreResult<()> {
        (**self).ensure_ready().await
    }

    async fn exists(&self, name: &str) -> RestoreResult<bool> {
        (**self).exists(name).await
    }

    async fn read(&self, name: &str) -> RestoreResult<Vec<u8>> {
        (**self).read(name).await
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> RestoreResult<()> {
        (**self).write(name, bytes).await
    }

    async fn remove(&self, name: &str) -> RestoreResult<()> {
        (**self).remove(name).await
    }

    async fn modified(&self, name: &str) -> RestoreResult<Option<SystemTime>> {
        (**self).modified(name).await
    }

    fn locate(&self, name: &str) -> PathBuf {
        (**self).locate(name)
    }
}

/// Directory-backed storage.
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Storage for DirStorage {
    async fn ensure_ready(&self) -> RestoreResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| RestoreError::io_at("create cache directory", &self.root, e))
    }

    async fn exists(&self, name: &str) -> RestoreResult<bool> {
        let path = self.locate(name);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| RestoreError::io_at("stat cache entry", &path, e))
    }

    async fn read(&self, name: &str) -> RestoreResult<Vec<u8>> {
        let path = self.locate(name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| RestoreError::io_at("read cache entry", &path, e))
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> RestoreResult<()> {
        let root = self.root.clone();
        let dest = self.locate(name);
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || publish_atomically(&root, &dest, &bytes)).await?
    }

    async fn remove(&self, name: &str) -> RestoreResult<()> {
        let path = self.locate(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RestoreError::io_at("remove cache entry", &path, e)),
        }
    }

    async fn modified(&self, name: &str) -> RestoreResult<Option<SystemTime>> {
        let path = self.locate(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.modified().ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RestoreError::io_at("stat cache entry", &path, e)),
        }
    }

    fn locate(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Write to a sibling temp file, flush, then rename over `dest`.
///
/// Concurrent writers for the same name race on the rename; every contender holds
/// identical bytes, so whichever rename lands last is as good as the first.
fn publish_atomically(root: &Path, dest: &Path, bytes: &[u8]) -> RestoreResult<()> {
    std::fs::create_dir_all(root)
        .map_err(|e| RestoreError::io_at("create cache directory", root, e))?;

    let mut partial = tempfile::Builder::new()
        .prefix(PARTIAL_PREFIX)
        .tempfile_in(root)
        .map_err(|e| RestoreError::io_at("create partial cache entry", root, e))?;
    partial
        .write_all(bytes)
        .map_err(|e| RestoreError::io_at("write partial cache entry", partial.path(), e))?;
    partial
        .as_file()
        .sync_all()
        .map_err(|e| RestoreError::io_at("flush partial cache entry", partial.path(), e))?;

    partial
        .persist(dest)
        .map_err(|e| RestoreError::io_at("publish cache entry", dest, e.error))?;
    Ok(())
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RwLock<HashMap<String, (Vec<u8>, SystemTime)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ensure_ready(&self) -> RestoreResult<()> {
        Ok(())
    }

    async fn exists(&self, name: &str) -> RestoreResult<bool> {
        Ok(self.files.read().await.contains_key(name))
    }

    async fn read(&self, name: &str) -> RestoreResult<Vec<u8>> {
        self.files
            .read()
            .await
            .get(name)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| {
                RestoreError::io_at(
                    "read cache entry",
                    self.locate(name),
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                )
            })
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> RestoreResult<()> {
        self.files
            .write()
            .await
            .insert(name.to_string(), (bytes.to_vec(), SystemTime::now()));
        Ok(())
    }

    async fn remove(&self, name: &str) -> RestoreResult<()> {
        self.files.write().await.remove(name);
        Ok(())
    }

    async fn modified(&self, name: &str) -> RestoreResult<Option<SystemTime>> {
        Ok(self.files.read().await.get(name).map(|(_, mtime)| *mtime))
    }

    fn locate(&self, name: &str) -> PathBuf {
        PathBuf::from("memory").join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dir_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::new(dir.path().join("cache"));
        storage.ensure_ready().await.unwrap();

        assert!(!storage.exists("a.jpg").await.unwrap());
        assert_eq!(storage.modified("a.jpg").await.unwrap(), None);

        storage.write("a.jpg", b"restored").await.unwrap();
        assert!(storage.exists("a.jpg").await.unwrap());
        assert_eq!(storage.read("a.jpg").await.unwrap(), b"restored");
        assert!(storage.modified("a.jpg").await.unwrap().is_some());

        storage.remove("a.jpg").await.unwrap();
        storage.remove("a.jpg").await.unwrap();
        assert!(!storage.exists("a.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_dir_storage_leaves_no_partials() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::new(dir.path());

        storage.write("b.jpg", &[1, 2, 3]).await.unwrap();
        storage.write("b.jpg", &[1, 2, 3]).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_dir_storage_creates_root_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::new(dir.path().join("nested").join("cache"));
        storage.write("c.jpg", b"x").await.unwrap();
        assert_eq!(storage.locate("c.jpg"), dir.path().join("nested/cache/c.jpg"));
        assert!(storage.locate("c.jpg").exists());
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty().await);
        storage.write("k", b"v").await.unwrap();
        assert_eq!(storage.len().await, 1);
        assert_eq!(storage.read("k").await.unwrap(), b"v");
        assert_eq!(storage.read("missing").await.unwrap_err().category(), "io");
        storage.remove("k").await.unwrap();
        assert!(!storage.exists("k").await.unwrap());
    }
}

//! # Output Cache
//!
//! Maps a source URL to its restored image. The name of a cache entry is the
//! lowercase hex MD5 of the URL plus a fixed extension, so the same URL always
//! lands on the same file.
//!
//! There is no lock. Two requests for the same URL may both miss and both
//! restore; both produce the same bytes and publishing is atomic, so the loser
//! of the race simply overwrites an identical file.

use std::path::PathBuf;
use std::time::SystemTime;

use tracing::debug;

use crate::error::RestoreResult;
use crate::storage::Storage;

/// Extension of every cache entry. Output is always re-encoded as JPEG.
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Cache file name for a URL.
pub fn fingerprint(url: &str) -> String {
    format!("{:x}.{}", md5::compute(url.as_bytes()), OUTPUT_EXTENSION)
}

/// A published restore result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub path: PathBuf,
    pub mtime: Option<SystemTime>,
}

/// Outcome of [`OutputCache::lookup_or_reserve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    pub fingerprint: String,
    /// Where the entry lives (or will live once committed).
    pub path: PathBuf,
    pub hit: bool,
    /// Set on hits.
    pub mtime: Option<SystemTime>,
}

impl CacheLookup {
    /// The existing entry, if this was a hit.
    pub fn entry(&self) -> Option<CacheEntry> {
        self.hit.then(|| CacheEntry {
            fingerprint: self.fingerprint.clone(),
            path: self.path.clone(),
            mtime: self.mtime,
        })
    }
}

/// Fingerprint-keyed cache over any [`Storage`].
pub struct OutputCache<S> {
    storage: S,
}

impl<S: Storage> OutputCache<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Check for an existing entry. On a miss the returned path is where
    /// [`commit`](Self::commit) will publish.
    pub async fn lookup_or_reserve(&self, url: &str) -> RestoreResult<CacheLookup> {
        let fingerprint = fingerprint(url);
        let path = self.storage.locate(&fingerprint);
        let hit = self.storage.exists(&fingerprint).await?;
        let mtime = if hit {
            self.storage.modified(&fingerprint).await?
        } else {
            None
        };
        debug!(%url, %fingerprint, hit, "cache lookup");
        Ok(CacheLookup {
            fingerprint,
            path,
            hit,
            mtime,
        })
    }

    /// Read the bytes behind a lookup.
    pub async fn read(&self, lookup: &CacheLookup) -> RestoreResult<Vec<u8>> {
        self.storage.read(&lookup.fingerprint).await
    }

    /// Publish the restored image for `url`.
    pub async fn commit(&self, url: &str, bytes: &[u8]) -> RestoreResult<CacheEntry> {
        let fingerprint = fingerprint(url);
        self.storage.write(&fingerprint, bytes).await?;
        let mtime = self.storage.modified(&fingerprint).await?;
        Ok(CacheEntry {
            path: self.storage.locate(&fingerprint),
            fingerprint,
            mtime,
        })
    }
}

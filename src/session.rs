//! # Restore Orchestration
//!
//! [`Restorer`] ties the pieces together for one URL:
//!
//! 1. cache lookup; a hit returns the stored bytes untouched
//! 2. fetch the scrambled page
//! 3. spool it to a scratch file owned by this request
//! 4. decode, parse the page key, resolve the strip count
//! 5. reassemble and encode as JPEG
//! 6. publish under the URL fingerprint
//! 7. delete the scratch file
//!
//! The scratch file is a [`NamedTempFile`], so it is removed on every exit path,
//! including errors and a dropped future. Requests for different URLs are fully
//! independent. Requests for the same URL are not serialized: both may restore,
//! and the second publish replaces the first with identical bytes.

use std::io::Write;
use std::path::PathBuf;

use futures_util::future::join_all;
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use crate::RestoreOptions;
use crate::cache::{CacheEntry, OutputCache};
use crate::error::{RestoreError, RestoreResult, classify};
use crate::fetch::Fetcher;
use crate::processing::{RawImage, reassemble};
use crate::source::SourceRequest;
use crate::storage::Storage;

const SCRATCH_PREFIX: &str = "scrambled-";

/// Result of a successful [`Restorer::handle`].
#[derive(Debug, Clone)]
pub struct RestoredImage {
    /// Encoded JPEG.
    pub bytes: Vec<u8>,
    pub entry: CacheEntry,
    pub from_cache: bool,
    /// Strip count used for this restore; `None` for cache hits.
    pub strip_count: Option<u32>,
}

/// Fetch, descramble and cache pages.
pub struct Restorer<F, S> {
    fetcher: F,
    cache: OutputCache<S>,
    options: RestoreOptions,
}

impl<F: Fetcher, S: Storage> Restorer<F, S> {
    pub fn new(fetcher: F, storage: S, options: RestoreOptions) -> Self {
        Self {
            fetcher,
            cache: OutputCache::new(storage),
            options,
        }
    }

    pub fn cache(&self) -> &OutputCache<S> {
        &self.cache
    }

    pub fn options(&self) -> &RestoreOptions {
        &self.options
    }

    /// Check that the cache location is usable, creating it if needed.
    pub async fn ping(&self) -> RestoreResult<()> {
        self.cache.storage().ensure_ready().await
    }

    /// Restore one page, or return the cached result.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn handle(&self, request: &SourceRequest) -> RestoreResult<RestoredImage> {
        let lookup = self.cache.lookup_or_reserve(&request.url).await?;
        if let Some(entry) = lookup.entry() {
            match self.cache.read(&lookup).await {
                Ok(bytes) => {
                    info!(path = %entry.path.display(), "cache hit");
                    return Ok(RestoredImage {
                        bytes,
                        entry,
                        from_cache: true,
                        strip_count: None,
                    });
                }
                // Swept by retention between the lookup and the read.
                Err(e) if classify::is_not_found(&e) => {
                    info!(path = %entry.path.display(), "cache entry vanished, restoring again");
                }
                Err(e) => return Err(e),
            }
        } else {
            info!(fingerprint = %lookup.fingerprint, "cache miss");
        }

        let body = self.fetcher.fetch(&request.url).await?;
        let scratch = spool(self.options.scratch_dir.clone(), body).await?;

        let restored = self.restore_spooled(request, &scratch).await;
        discard(scratch);
        let restored = restored?;

        info!(
            path = %restored.entry.path.display(),
            strips = restored.strip_count,
            bytes = restored.bytes.len(),
            "restored"
        );
        Ok(restored)
    }

    /// Restore several pages concurrently. Results come back in input order and
    /// one failure does not stop the others.
    pub async fn handle_many(
        &self,
        requests: &[SourceRequest],
    ) -> Vec<RestoreResult<RestoredImage>> {
        join_all(requests.iter().map(|request| self.handle(request))).await
    }

    async fn restore_spooled(
        &self,
        request: &SourceRequest,
        scratch: &NamedTempFile,
    ) -> RestoreResult<RestoredImage> {
        let path = scratch.path().to_path_buf();
        let image = tokio::task::spawn_blocking(move || RawImage::open(&path))
            .await?
            .map_err(|e| {
                e.with_context("decoding scrambled download")
                    .with_metadata("url", request.url.as_str())
            })?;

        let strip_count = request.key()?.strip_count()?;

        let quality = self.options.jpeg_quality;
        let bytes = tokio::task::spawn_blocking(move || {
            reassemble(image, strip_count)?.encode_jpeg(quality)
        })
        .await??;

        let entry = self.cache.commit(&request.url, &bytes).await?;
        Ok(RestoredImage {
            bytes,
            entry,
            from_cache: false,
            strip_count: Some(strip_count),
        })
    }
}

/// Write the download to a fresh scratch file.
async fn spool(dir: Option<PathBuf>, body: Vec<u8>) -> RestoreResult<NamedTempFile> {
    tokio::task::spawn_blocking(move || {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let mut file = match &dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .map_err(|e| RestoreError::io_at("create scratch directory", dir, e))?;
                builder
                    .tempfile_in(dir)
                    .map_err(|e| RestoreError::io_at("create scratch file", dir, e))?
            }
            None => builder
                .tempfile()
                .map_err(|e| RestoreError::io("create scratch file", e))?,
        };
        file.write_all(&body)
            .and_then(|()| file.flush())
            .map_err(|e| RestoreError::io_at("write scratch file", file.path(), e))?;
        Ok(file)
    })
    .await?
}

fn discard(scratch: NamedTempFile) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!(path = %path.display(), error = %e, "failed to delete scratch file");
    }
}

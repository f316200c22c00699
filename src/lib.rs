//! # Strip Restore Library
//!
//! Restores images that an image host serves strip-scrambled: the page is cut into
//! full-width horizontal strips whose vertical order is reversed, with the strip
//! count derived from the page's content id and segment index.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//! - `source`: page keys (content id, segment index) parsed from URLs
//! - `fetch`: the HTTP collaborator that downloads scrambled pages
//! - `processing`: decode, reassemble and JPEG re-encode
//! - `cache` / `storage`: fingerprint-named output files with atomic publish
//! - `session`: the [`Restorer`] that orchestrates one request end to end
//! - `config`: configuration and validation
//!
//! Strip-count resolution and band geometry live in the `strip-plan` crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use strip_restore::{RestoreConfig, reconstruct};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RestoreConfig::new("restored");
//! let image = reconstruct("https://cdn.example.com/media/photos/300000/00005.webp", &config).await?;
//! println!("{} ({} bytes)", image.entry.path.display(), image.bytes.len());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod processing;
pub mod session;
pub mod source;
pub mod storage;

pub use cache::{CacheEntry, CacheLookup, OutputCache, fingerprint};
pub use config::RestoreConfig;
pub use error::{
    ErrorContext, ErrorSeverity, HasRecoverySuggestion, HasSeverity, RestoreError, RestoreResult,
    Retryable,
};
pub use fetch::{Fetcher, HttpFetcher};
pub use session::{RestoredImage, Restorer};
pub use source::{SourceKey, SourceRequest};
pub use storage::{DirStorage, MemoryStorage, Storage};

/// Runtime knobs for a [`Restorer`].
///
/// Fetch-side settings (timeout, headers) belong to the [`Fetcher`] and are not
/// repeated here.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// JPEG quality for restored output, 1-100.
    pub jpeg_quality: u8,

    /// Directory for per-request scratch files. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            scratch_dir: None,
        }
    }
}

/// Restore a single URL with an HTTP fetcher and a directory cache built from `config`.
///
/// For many URLs build one [`Restorer`] and reuse it; this helper sets up a new
/// HTTP client on every call.
pub async fn reconstruct(url: &str, config: &RestoreConfig) -> RestoreResult<RestoredImage> {
    config
        .validate()
        .map_err(|reason| RestoreError::config("config", "", reason))?;

    let restorer = Restorer::new(
        HttpFetcher::new(config)?,
        DirStorage::new(&config.cache_dir),
        config.to_restore_options(),
    );
    restorer.ping().await?;
    restorer.handle(&SourceRequest::new(url)).await
}

//! # Configuration Module
//!
//! Configuration for restore runs. It is the common interface between the CLI and
//! the library: the CLI fills a [`RestoreConfig`], validates it, and hands the
//! pieces to the fetcher, the storage and the [`crate::Restorer`].
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `cache_dir` | `PathBuf` | non-empty | Directory holding restored images |
//! | `scratch_dir` | `Option<PathBuf>` | any | Where scrambled downloads are spooled (system temp if unset) |
//! | `fetch_timeout` | `Duration` | > 0 | Bound on one HTTP fetch |
//! | `jpeg_quality` | `u8` | 1-100 | Quality of the re-encoded output |
//! | `user_agent` | `String` | non-empty | `User-Agent` sent to the host |
//! | `referer` | `Option<String>` | any | `Referer` sent to the host |
//! | `cookie` | `Option<String>` | any | `Cookie` sent to the host |
//! | `headers` | `Vec<(String, String)>` | valid header names | Extra request headers |
//!
//! ## Duration Formats
//!
//! [`parse_duration`] accepts raw seconds (`30`), or a number with a unit:
//! `500ms`, `30s`, `2m`, `1h`.
//!
//! ## Examples
//!
//! ```rust
//! use strip_restore::config::RestoreConfig;
//!
//! let mut config = RestoreConfig::default();
//! config.referer = Some("https://reader.example.com/".to_string());
//! assert!(config.validate().is_ok());
//!
//! let options = config.to_restore_options();
//! assert_eq!(options.jpeg_quality, 90);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};

/// Browser-like agent; hosts that guard against hotlinking often reject bare clients.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Configuration structure for restore operations.
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Directory where restored images are cached under their URL fingerprint.
    ///
    /// Created on first use. Retention is managed outside this crate.
    pub cache_dir: PathBuf,

    /// Directory for transient scrambled downloads. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,

    /// Upper bound on a single fetch. Expiry surfaces as `FetchFailed`.
    pub fetch_timeout: Duration,

    /// JPEG quality for the restored output (1-100).
    pub jpeg_quality: u8,

    /// `User-Agent` header for every fetch.
    pub user_agent: String,

    /// Optional `Referer` header; most anti-hotlink hosts check it.
    pub referer: Option<String>,

    /// Optional raw `Cookie` header value.
    pub cookie: Option<String>,

    /// Extra request headers as `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
}

impl Default for RestoreConfig {
    /// Defaults suitable for a local run:
    /// - `cache_dir`: "restored"
    /// - `fetch_timeout`: 30 seconds
    /// - `jpeg_quality`: 90
    /// - no referer, cookie or extra headers
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("restored"),
            scratch_dir: None,
            fetch_timeout: Duration::from_secs(30),
            jpeg_quality: 90,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: None,
            cookie: None,
            headers: Vec::new(),
        }
    }
}

impl RestoreConfig {
    /// Creates a configuration with the given cache directory and defaults elsewhere.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err("Cache directory must not be empty".to_string());
        }
        if self.fetch_timeout.is_zero() {
            return Err("Fetch timeout must be greater than 0".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("User agent must not be empty".to_string());
        }
        for (name, value) in &self.headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(format!("Invalid header name: {}", name));
            }
            if HeaderValue::from_str(value).is_err() {
                return Err(format!("Invalid value for header {}", name));
            }
        }
        Ok(())
    }

    /// Convert to RestoreOptions for use with the restorer
    pub fn to_restore_options(&self) -> crate::RestoreOptions {
        crate::RestoreOptions {
            jpeg_quality: self.jpeg_quality,
            scratch_dir: self.scratch_dir.clone(),
        }
    }
}

/// Parse duration string like "500ms", "30s", "2m", "1h" (or bare seconds).
pub fn parse_duration(duration: &str) -> Result<Duration, String> {
    let duration = duration.trim();
    if let Ok(seconds) = duration.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let split = duration
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("Invalid duration format: {}", duration))?;
    let (num_str, unit) = duration.split_at(split);
    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", duration))?;

    let seconds_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(num)),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => {
            return Err(format!(
                "Invalid duration unit: {}. Use 'ms', 's', 'm' or 'h'",
                unit
            ));
        }
    };
    num.checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("Duration out of range: {}", duration))
}

/// Parse a `Name: value` header argument.
pub fn parse_header(header: &str) -> Result<(String, String), String> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| format!("Header must look like 'Name: value': {}", header))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Header name is empty: {}", header));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

//! Page keys carried in source URLs.
//!
//! Hosts publish scrambled pages under `.../<content id>/<segment index>.<ext>`, e.g.
//! `https://cdn.example.com/media/photos/300000/00005.webp`.

use reqwest::Url;

use crate::error::{RestoreError, RestoreResult};

/// One restore request. Lives only for the duration of a single `handle` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub url: String,
}

impl SourceRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Parse the page key out of the URL path.
    pub fn key(&self) -> RestoreResult<SourceKey> {
        SourceKey::from_url(&self.url)
    }
}

/// Content id and segment index, both kept as the exact strings found in the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKey {
    pub content_id: String,
    pub segment_index: String,
}

impl SourceKey {
    /// `content_id` is the second-to-last path segment, `segment_index` the file
    /// stem of the last one. Empty segments (e.g. from a trailing slash) are ignored.
    pub fn from_url(url: &str) -> RestoreResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| RestoreError::invalid_key(url, format!("not a valid URL: {}", e)))?;

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let [.., content_id, file_name] = segments.as_slice() else {
            return Err(RestoreError::invalid_key(
                url,
                format!(
                    "path needs at least 2 segments, found {}",
                    segments.len()
                ),
            ));
        };

        let segment_index = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => *file_name,
        };

        Ok(Self {
            content_id: (*content_id).to_string(),
            segment_index: segment_index.to_string(),
        })
    }

    /// Number of strips this page was cut into.
    pub fn strip_count(&self) -> RestoreResult<u32> {
        strip_plan::resolve_strip_count(&self.content_id, &self.segment_index).map_err(|e| {
            RestoreError::invalid_key(
                format!("{}/{}", self.content_id, self.segment_index),
                e.to_string(),
            )
        })
    }
}

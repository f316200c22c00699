//! Failure handling: nothing cached, nothing left in the scratch directory.

mod common;

use common::assertions::dir_entries;
use common::fetchers::{CountingFetcher, FailingFetcher};
use common::fixtures;
use strip_restore::error::classify;
use strip_restore::{
    DirStorage, Fetcher, RestoreError, RestoreOptions, Restorer, Retryable, SourceRequest,
};

const URL: &str = "https://cdn.example.com/media/photos/300000/00001.webp";

struct Dirs {
    cache: tempfile::TempDir,
    scratch: tempfile::TempDir,
}

impl Dirs {
    fn new() -> Self {
        Self {
            cache: tempfile::tempdir().unwrap(),
            scratch: tempfile::tempdir().unwrap(),
        }
    }

    fn restorer<F: Fetcher>(&self, fetcher: F) -> Restorer<F, DirStorage> {
        let options = RestoreOptions {
            scratch_dir: Some(self.scratch.path().to_path_buf()),
            ..RestoreOptions::default()
        };
        Restorer::new(fetcher, DirStorage::new(self.cache.path()), options)
    }

    fn assert_clean(&self) {
        assert!(dir_entries(self.cache.path()).is_empty(), "cache not empty");
        assert!(dir_entries(self.scratch.path()).is_empty(), "scratch not empty");
    }
}

#[tokio::test]
async fn test_fetch_failure_is_reported_with_status() {
    let dirs = Dirs::new();
    let err = dirs
        .restorer(FailingFetcher { status: 404 })
        .handle(&SourceRequest::new(URL))
        .await
        .unwrap_err();

    match &err {
        RestoreError::FetchFailed { status, url, .. } => {
            assert_eq!(*status, Some(404));
            assert_eq!(url, URL);
        }
        other => panic!("expected FetchFailed, got {:?}", other),
    }
    assert!(!err.is_retryable());
    assert!(!classify::is_transient(&err));
    dirs.assert_clean();
}

#[tokio::test]
async fn test_server_errors_are_classified_transient() {
    let dirs = Dirs::new();
    let err = dirs
        .restorer(FailingFetcher { status: 503 })
        .handle(&SourceRequest::new(URL))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "fetch_failed");
    assert!(err.is_retryable());
    assert!(classify::is_transient(&err));
}

#[tokio::test]
async fn test_non_image_body_is_decode_failure() {
    let dirs = Dirs::new();
    let err = dirs
        .restorer(CountingFetcher::new(b"<html>hotlinking denied</html>".to_vec()))
        .handle(&SourceRequest::new(URL))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "decode_failed");
    dirs.assert_clean();
}

#[tokio::test]
async fn test_single_segment_path_is_invalid_key() {
    let dirs = Dirs::new();
    let err = dirs
        .restorer(CountingFetcher::new(fixtures::page(2, 0).scrambled_png))
        .handle(&SourceRequest::new("https://cdn.example.com/00001.webp"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "invalid_key");
    dirs.assert_clean();
}

#[tokio::test]
async fn test_non_integer_content_id_is_invalid_key() {
    let dirs = Dirs::new();
    let err = dirs
        .restorer(CountingFetcher::new(fixtures::page(2, 0).scrambled_png))
        .handle(&SourceRequest::new(
            "https://cdn.example.com/media/photos/latest/00001.webp",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "invalid_key");
    assert!(classify::is_caller_error(&err));
    dirs.assert_clean();
}

#[tokio::test]
async fn test_scratch_directory_is_emptied_after_success() {
    let dirs = Dirs::new();
    let restored = dirs
        .restorer(CountingFetcher::new(fixtures::page(16, 5).scrambled_png))
        .handle(&SourceRequest::new(URL))
        .await
        .unwrap();
    assert!(restored.entry.path.exists());
    assert!(dir_entries(dirs.scratch.path()).is_empty());
}

//! # Restore Error Handling
//!
//! One error type for the whole restore pipeline, with enough context attached
//! to tell the caller what failed and whether trying again could help.
//!
//! ## Taxonomy
//!
//! - `InvalidKey`: the URL path does not yield a content id and segment index,
//!   or the content id is not an integer
//! - `FetchFailed`: transport error, timeout or non-success status from the host
//! - `DecodeFailed`: the fetched bytes are not a raster image
//! - `InvalidPlan`: strip count or image height is zero. This is an internal
//!   invariant violation and points at a resolver or reassembler bug
//! - `EncodeFailed`, `Io`, `Config`, `Task`: the ambient failures around them
//!
//! None of these are retried inside the library. [`Retryable`] only classifies;
//! the retry policy belongs to whoever calls [`crate::Restorer::handle`].
//!
//! ## Usage
//!
//! ```rust
//! use strip_restore::error::{RestoreError, Retryable};
//!
//! let error = RestoreError::fetch_failed("https://cdn.example.com/a/1.webp", Some(503), "service unavailable")
//!     .with_context("downloading scrambled page")
//!     .with_recovery_suggestion("retry later");
//!
//! assert_eq!(error.category(), "fetch_failed");
//! assert!(error.is_retryable());
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Errors that fail the current request
    Error,
    /// Broken invariants that indicate a bug
    Critical,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Additional metadata as key-value pairs
    pub metadata: std::collections::HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            metadata: std::collections::HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set severity level
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Base error type for the restore pipeline
#[derive(Debug)]
pub enum RestoreError {
    /// The URL cannot be decomposed into a page key
    InvalidKey {
        url: String,
        reason: String,
        context: ErrorContext,
    },
    /// The host could not be reached or answered with a non-success status
    FetchFailed {
        url: String,
        status: Option<u16>,
        reason: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Fetched bytes are not a decodable raster image
    DecodeFailed {
        reason: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Zero strips or zero rows reached the reassembler
    InvalidPlan {
        strip_count: u32,
        height: u32,
        reason: String,
        context: ErrorContext,
    },
    /// The restored canvas could not be encoded
    EncodeFailed {
        format: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// A blocking worker panicked or was cancelled
    Task {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
}

impl RestoreError {
    /// Create an invalid key error
    pub fn invalid_key(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            url: url.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a fetch error
    pub fn fetch_failed(
        url: impl Into<String>,
        status: Option<u16>,
        reason: impl Into<String>,
    ) -> Self {
        Self::FetchFailed {
            url: url.into(),
            status,
            reason: reason.into(),
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Create a fetch error wrapping a transport error
    pub fn fetch_transport(
        url: impl Into<String>,
        reason: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::FetchFailed {
            url: url.into(),
            status: None,
            reason: reason.into(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(),
        }
    }

    /// Create a decode error from a codec error
    pub fn decode_source(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::DecodeFailed {
            reason: source.to_string(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(),
        }
    }

    /// Create an invalid plan error. Always critical.
    pub fn invalid_plan(strip_count: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidPlan {
            strip_count,
            height,
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    /// Create an encode error
    pub fn encode_failed(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error for a specific path
    pub fn io_at(
        operation: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.as_ref().display().to_string()),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a worker task error
    pub fn task(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Task {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidKey { context, .. } => context,
            Self::FetchFailed { context, .. } => context,
            Self::DecodeFailed { context, .. } => context,
            Self::InvalidPlan { context, .. } => context,
            Self::EncodeFailed { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Task { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::InvalidKey { context, .. } => context,
            Self::FetchFailed { context, .. } => context,
            Self::DecodeFailed { context, .. } => context,
            Self::InvalidPlan { context, .. } => context,
            Self::EncodeFailed { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Task { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidKey { .. } => "invalid_key",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::DecodeFailed { .. } => "decode_failed",
            Self::InvalidPlan { .. } => "invalid_plan",
            Self::EncodeFailed { .. } => "encode_failed",
            Self::Io { .. } => "io",
            Self::Config { .. } => "config",
            Self::Task { .. } => "task",
        }
    }
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreError::InvalidKey { url, reason, .. } => {
                write!(f, "Invalid page key in '{}': {}", url, reason)
            }
            RestoreError::FetchFailed {
                url,
                status,
                reason,
                ..
            } => {
                if let Some(status) = status {
                    write!(f, "Fetching '{}' failed with status {}: {}", url, status, reason)
                } else {
                    write!(f, "Fetching '{}' failed: {}", url, reason)
                }
            }
            RestoreError::DecodeFailed { reason, .. } => {
                write!(f, "Image decode failed: {}", reason)
            }
            RestoreError::InvalidPlan {
                strip_count,
                height,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid strip plan ({} strips, height {}): {}",
                    strip_count, height, reason
                )
            }
            RestoreError::EncodeFailed { format, reason, .. } => {
                write!(f, "Encoding {} failed: {}", format, reason)
            }
            RestoreError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(f, "I/O error during {} on '{}': {}", operation, path, source)
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            RestoreError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            RestoreError::Task {
                operation, reason, ..
            } => {
                write!(f, "Worker for {} failed: {}", operation, reason)
            }
        }
    }
}

impl StdError for RestoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::FetchFailed {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            Self::DecodeFailed {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type RestoreResult<T> = Result<T, RestoreError>;

/// Trait for errors that can be retried by the caller
pub trait Retryable {
    /// Check if this error can be retried
    fn is_retryable(&self) -> bool;

    /// Get the recommended retry delay in milliseconds
    fn retry_delay_ms(&self) -> Option<u64> {
        None
    }
}

impl Retryable for RestoreError {
    fn is_retryable(&self) -> bool {
        match self {
            // 4xx (other than 408/429) will not change on retry
            Self::FetchFailed {
                status: Some(status),
                ..
            } => *status >= 500 || *status == 408 || *status == 429,
            Self::FetchFailed { status: None, .. } | Self::Io { .. } => true,
            _ => false,
        }
    }

    fn retry_delay_ms(&self) -> Option<u64> {
        if !self.is_retryable() {
            return None;
        }
        match self {
            Self::FetchFailed { .. } => Some(2000),
            Self::Io { .. } => Some(100),
            _ => None,
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for RestoreError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for RestoreError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Check if an error is transient (may resolve itself)
    pub fn is_transient(error: &RestoreError) -> bool {
        error.is_retryable()
    }

    /// Check if the caller sent something we can never restore
    pub fn is_caller_error(error: &RestoreError) -> bool {
        matches!(
            error,
            RestoreError::InvalidKey { .. } | RestoreError::DecodeFailed { .. }
        )
    }

    /// Check if an I/O error means the file is simply not there
    pub fn is_not_found(error: &RestoreError) -> bool {
        matches!(
            error,
            RestoreError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Check if an error indicates a bug rather than bad input
    pub fn is_internal(error: &RestoreError) -> bool {
        error.severity() >= ErrorSeverity::Critical
    }
}

/// Error conversion implementations
impl From<tokio::task::JoinError> for RestoreError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::task("blocking render", error.to_string())
    }
}

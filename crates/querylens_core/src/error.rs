//! Error types for querylens.
//!
//! Per-entry parse failures are deliberately *not* represented here: they are
//! captured as data in [`SearchedFile`](crate::models::SearchedFile) so that
//! one corrupt file inside a large archive does not sacrifice the rest of the
//! batch. This enum covers the failures that do terminate a call.

use thiserror::Error;

/// Main error type for querylens.
#[derive(Debug, Error)]
pub enum QuerylensError {
    /// The archive container itself could not be opened or iterated.
    #[error("Archive error: {message}")]
    Archive {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A query log line could not be decoded.
    #[error("Decode error in {file}: {message}")]
    Decode {
        /// Name of the entry being parsed.
        file: String,
        /// Human-readable error message.
        message: String,
    },

    /// Worker-pool coordination failed (a task panicked or was cancelled).
    ///
    /// Unlike per-entry failures, these indicate the coordination mechanism
    /// itself is compromised and partial results cannot be trusted.
    #[error("Worker pool error: {message}")]
    Pool {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A time range with finish before start was passed to bucket construction.
    #[error("Invalid time range: start {start} is after finish {finish}")]
    InvalidRange {
        /// Requested range start, epoch milliseconds.
        start: i64,
        /// Requested range finish, epoch milliseconds.
        finish: i64,
    },

    /// A non-positive bucket width was passed to bucket construction.
    #[error("Invalid bucket size: {bucket_size_ms} ms")]
    InvalidBucketSize {
        /// Requested bucket width in milliseconds.
        bucket_size_ms: i64,
    },

    /// Filesystem I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl QuerylensError {
    // ========== Constructors ==========

    /// Create a new archive error.
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive { message: message.into(), source: None }
    }

    /// Create a new archive error with source.
    pub fn archive_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Archive { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a new decode error.
    pub fn decode(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode { file: file.into(), message: message.into() }
    }

    /// Create a new worker-pool error.
    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool { message: message.into(), source: None }
    }

    /// Create a new worker-pool error with source.
    pub fn pool_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Pool { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a new invalid-range error.
    pub fn invalid_range(start: i64, finish: i64) -> Self {
        Self::InvalidRange { start, finish }
    }

    // ========== Methods ==========

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Archive { .. } => "Archive",
            Self::Decode { .. } => "Decode",
            Self::Pool { .. } => "Pool",
            Self::InvalidRange { .. } => "Range",
            Self::InvalidBucketSize { .. } => "Range",
            Self::Io { .. } => "I/O",
        }
    }

    /// Whether this error is recoverable at the per-entry level.
    ///
    /// Recoverable errors become failed `SearchedFile` records; the rest
    /// terminate the ingestion or summarization call.
    pub fn is_entry_recoverable(&self) -> bool {
        matches!(self, Self::Archive { .. } | Self::Decode { .. } | Self::Io { .. })
    }
}

// ========== Error Conversions ==========

/// Convert from std::io::Error to QuerylensError.
impl From<std::io::Error> for QuerylensError {
    fn from(err: std::io::Error) -> Self {
        QuerylensError::Io { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

/// Convert from zip::result::ZipError to QuerylensError.
impl From<zip::result::ZipError> for QuerylensError {
    fn from(err: zip::result::ZipError) -> Self {
        QuerylensError::Archive { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

/// Convert from tokio::task::JoinError to QuerylensError.
impl From<tokio::task::JoinError> for QuerylensError {
    fn from(err: tokio::task::JoinError) -> Self {
        QuerylensError::Pool {
            message: format!("worker task failed to complete: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteError;

/// Typed download errors enabling retry classification.
///
/// The `is_retryable()` method separates transient failures (transport errors,
/// bad statuses, short bodies, URL resolution hiccups) from local disk
/// failures, which the retry loop surfaces immediately.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Could not resolve download URL for {path}: {source}")]
    Resolve { source: RemoteError, path: String },

    #[error("HTTP error {status} downloading {path}")]
    HttpStatus { status: u16, path: String },

    #[error("HTTP error downloading {path} (bytes_so_far={bytes_written}): {source}")]
    Http {
        source: reqwest::Error,
        path: String,
        bytes_written: u64,
    },

    #[error("Size mismatch for {path}: expected {expected} bytes, have {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),

    #[error("Download of {path} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        path: String,
        last_error: String,
    },
}

impl DownloadError {
    /// Whether this error is transient and worth retrying.
    ///
    /// Every non-2xx status is retried because each attempt resolves a fresh
    /// download URL, and expired signed URLs show up as 403/404.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::Resolve { source, .. } => source.is_retryable(),
            DownloadError::HttpStatus { .. } => true,
            DownloadError::Http { .. } => true,
            DownloadError::SizeMismatch { .. } => true,
            DownloadError::Disk(_) => false,
            DownloadError::RetriesExhausted { .. } => false,
        }
    }
}

/// Pointer-file failures. All are permanent for the item in this pass.
#[derive(Debug, Error)]
pub enum StrmError {
    #[error("{file} is missing required metadata field '{field}'")]
    MissingField { file: String, field: &'static str },

    #[error("Metadata lookup failed for {file}: {source}")]
    Metadata { file: String, source: RemoteError },

    #[error("Could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures that abort a directory walk.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Listing directory {directory_id} failed: {source}")]
    Listing {
        directory_id: u64,
        source: RemoteError,
    },

    #[error("Could not create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Interrupted by shutdown signal")]
    Interrupted,
}

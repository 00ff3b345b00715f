use std::path::Path;

use futures_util::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;
use crate::remote::{RemoteDirectory, RemoteItem};
use crate::retry::{self, RetryAction, RetryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    /// The local file already had the declared size; nothing was fetched.
    AlreadyComplete,
    DryRun,
}

/// Length of the file at `path`, or `None` if there is no regular file.
async fn local_len(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// Download a sidecar file, resuming any partial local copy.
///
/// A local file whose length equals the declared remote size counts as
/// complete and costs no network call. Otherwise each attempt resolves a
/// fresh download URL and requests only the missing tail. Retries with
/// exponential backoff on transient failures.
pub async fn download_file(
    client: &Client,
    remote: &dyn RemoteDirectory,
    item: &RemoteItem,
    download_path: &Path,
    dry_run: bool,
    retry_config: &RetryConfig,
) -> Result<DownloadOutcome, DownloadError> {
    if local_len(download_path).await == Some(item.size) {
        tracing::info!("Already complete: {}", download_path.display());
        return Ok(DownloadOutcome::AlreadyComplete);
    }

    if dry_run {
        tracing::info!("[DRY RUN] Would download {}", download_path.display());
        return Ok(DownloadOutcome::DryRun);
    }

    if let Some(parent) = download_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let result = retry::retry_with_backoff(
        retry_config,
        |e: &DownloadError| {
            if e.is_retryable() {
                RetryAction::Retry
            } else {
                RetryAction::Abort
            }
        },
        || attempt_download(client, remote, item, download_path),
    )
    .await;

    match result {
        Ok(()) => {
            tracing::info!("Downloaded {}", download_path.display());
            Ok(DownloadOutcome::Downloaded)
        }
        Err(e) if e.is_retryable() => Err(DownloadError::RetriesExhausted {
            attempts: retry_config.total_attempts(),
            path: download_path.display().to_string(),
            last_error: e.to_string(),
        }),
        Err(e) => Err(e),
    }
}

/// Single resolve-fetch-write attempt.
async fn attempt_download(
    client: &Client,
    remote: &dyn RemoteDirectory,
    item: &RemoteItem,
    download_path: &Path,
) -> Result<(), DownloadError> {
    let path_str = download_path.display().to_string();

    // An earlier attempt may have finished the body but failed afterwards.
    let existing = local_len(download_path).await;
    if existing == Some(item.size) {
        return Ok(());
    }

    let url = remote
        .download_url(item)
        .await
        .map_err(|source| DownloadError::Resolve {
            source,
            path: path_str.clone(),
        })?;

    let offset = match existing {
        Some(len) if len < item.size => {
            tracing::info!(
                "Resuming {} [{}/{} bytes]",
                path_str,
                len,
                item.size
            );
            len
        }
        Some(len) => {
            tracing::warn!(
                "{} is larger than the remote file ({} > {} bytes), downloading again",
                path_str,
                len,
                item.size
            );
            0
        }
        None => 0,
    };

    let mut request = client.get(&url);
    if offset > 0 {
        request = request.header(RANGE, format!("bytes={}-", offset));
    }
    let response = request.send().await.map_err(|e| DownloadError::Http {
        source: e,
        path: path_str.clone(),
        bytes_written: 0,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus {
            status: status.as_u16(),
            path: path_str,
        });
    }

    let append = offset > 0 && status == StatusCode::PARTIAL_CONTENT;
    if offset > 0 && !append {
        tracing::warn!(
            "Server ignored range request for {} (status={}), restarting from zero",
            path_str,
            status.as_u16()
        );
    }

    let mut file = if append {
        OpenOptions::new().append(true).open(download_path).await?
    } else {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(download_path)
            .await?
    };

    let mut bytes_written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::Http {
            source: e,
            path: path_str.clone(),
            bytes_written,
        })?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    let actual = local_len(download_path).await.unwrap_or(0);
    if actual != item.size {
        return Err(DownloadError::SizeMismatch {
            path: path_str,
            expected: item.size,
            actual,
        });
    }

    Ok(())
}

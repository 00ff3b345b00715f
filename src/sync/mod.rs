//! Sync engine: walks the remote tree depth-first and mirrors it locally.
//!
//! Media files become `.strm` pointer files, subtitles are downloaded in full,
//! everything else is skipped. The walk is strictly sequential and paced with
//! fixed delays so the remote API's rate limits are respected. Local files
//! are the only progress record, which makes re-runs idempotent.

pub mod error;
pub mod file;
pub mod paths;
pub mod strm;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::Dispatch;

use crate::remote::{RemoteDirectory, RemoteItem};
use crate::retry::{self, RetryAction, RetryConfig};
use error::SyncError;
use file::DownloadOutcome;
use paths::ItemKind;
use strm::{StrmOptions, StrmOutcome};

/// Subset of application config consumed by the sync engine.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub(crate) local_root: PathBuf,
    pub(crate) strm_base_url: String,
    pub(crate) sidecar_only: bool,
    pub(crate) force_regenerate: bool,
    pub(crate) dry_run: bool,
    /// Pause after each successfully processed entry.
    pub(crate) request_delay: Duration,
    /// Pause after each directory listing.
    pub(crate) dir_delay: Duration,
    pub(crate) retry: RetryConfig,
}

/// Per-run counters, reported in the closing summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub directories: usize,
    pub strm_written: usize,
    pub strm_existing: usize,
    pub downloaded: usize,
    pub already_complete: usize,
    pub ignored: usize,
    pub failed: usize,
}

/// Result of handling one non-directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Success,
    Ignored,
    Failed,
}

/// A listed directory whose children are still being worked through.
struct Frame {
    directory_id: u64,
    local_path: PathBuf,
    pending: std::vec::IntoIter<RemoteItem>,
    started: Instant,
}

pub struct Synchronizer {
    remote: Arc<dyn RemoteDirectory>,
    client: Client,
    config: SyncConfig,
    logger: Dispatch,
}

impl Synchronizer {
    /// Create a synchronizer that logs to whatever dispatcher is current at
    /// construction time.
    pub fn new(remote: Arc<dyn RemoteDirectory>, client: Client, config: SyncConfig) -> Self {
        Self {
            remote,
            client,
            config,
            logger: tracing::dispatcher::get_default(|d| d.clone()),
        }
    }

    /// Route all events emitted during a run to `logger`.
    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.logger = logger;
        self
    }

    /// Mirror the remote directory `root_id` into the configured local root.
    ///
    /// Item failures are logged and counted; a directory that cannot be
    /// listed or created ends the run. Cancelling `shutdown` stops the walk
    /// at the next await point and yields [`SyncError::Interrupted`].
    pub async fn run(
        &self,
        root_id: u64,
        shutdown: CancellationToken,
    ) -> Result<SyncStats, SyncError> {
        async {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => Err(SyncError::Interrupted),
                result = self.walk(root_id) => result,
            }
        }
        .with_subscriber(self.logger.clone())
        .await
    }

    async fn walk(&self, root_id: u64) -> Result<SyncStats, SyncError> {
        let started = Instant::now();
        let mut stats = SyncStats::default();

        self.ensure_dir(&self.config.local_root).await?;
        let root = self
            .open_directory(root_id, self.config.local_root.clone(), &mut stats)
            .await?;
        let mut stack = vec![root];

        // Depth-first, pre-order: a subdirectory's frame goes on top of its
        // parent's, so its whole subtree finishes before the next sibling.
        while let Some(frame) = stack.last_mut() {
            let Some(item) = frame.pending.next() else {
                if let Some(done) = stack.pop() {
                    tracing::info!(
                        "Finished directory {} in {}",
                        done.directory_id,
                        format_duration(done.started.elapsed())
                    );
                }
                if !stack.is_empty() {
                    self.pause(self.config.request_delay).await;
                }
                continue;
            };
            let parent = frame.local_path.clone();

            tracing::info!("Processing: {}", item.name);
            let kind = paths::classify(&item.name, item.is_directory, self.config.sidecar_only);
            let outcome = match kind {
                ItemKind::Directory => {
                    let local_path = parent.join(paths::sanitize_name(&item.name));
                    self.ensure_dir(&local_path).await?;
                    let child = self.open_directory(item.id, local_path, &mut stats).await?;
                    stack.push(child);
                    continue;
                }
                ItemKind::Media => self.emit_pointer(&item, &parent, &mut stats).await,
                ItemKind::Sidecar => self.download_sidecar(&item, &parent, &mut stats).await,
                ItemKind::Ignored => {
                    tracing::debug!("Ignoring {}", item.name);
                    stats.ignored += 1;
                    ItemOutcome::Ignored
                }
            };

            if outcome == ItemOutcome::Success {
                self.pause(self.config.request_delay).await;
            }
        }

        log_summary(&stats, started.elapsed(), self.config.dry_run);
        Ok(stats)
    }

    /// List a directory (with retries on transient errors), then pause.
    async fn open_directory(
        &self,
        directory_id: u64,
        local_path: PathBuf,
        stats: &mut SyncStats,
    ) -> Result<Frame, SyncError> {
        tracing::info!("Entering directory {} -> {}", directory_id, local_path.display());
        let started = Instant::now();

        let items = retry::retry_with_backoff(
            &self.config.retry,
            |e: &crate::remote::RemoteError| {
                if e.is_retryable() {
                    RetryAction::Retry
                } else {
                    RetryAction::Abort
                }
            },
            || self.remote.list(directory_id),
        )
        .await
        .map_err(|source| SyncError::Listing {
            directory_id,
            source,
        })?;

        stats.directories += 1;
        self.pause(self.config.dir_delay).await;

        Ok(Frame {
            directory_id,
            local_path,
            pending: items.into_iter(),
            started,
        })
    }

    async fn ensure_dir(&self, path: &Path) -> Result<(), SyncError> {
        if self.config.dry_run {
            return Ok(());
        }
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|source| SyncError::CreateDir {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn emit_pointer(
        &self,
        item: &RemoteItem,
        directory: &Path,
        stats: &mut SyncStats,
    ) -> ItemOutcome {
        let options = StrmOptions {
            base_url: &self.config.strm_base_url,
            force_regenerate: self.config.force_regenerate,
            dry_run: self.config.dry_run,
        };
        match strm::emit_strm(self.remote.as_ref(), item, directory, options).await {
            Ok(StrmOutcome::Written) => stats.strm_written += 1,
            Ok(StrmOutcome::Existing) => stats.strm_existing += 1,
            Ok(StrmOutcome::DryRun) => {}
            Err(e) => {
                tracing::error!("Failed to process {}: {}", item.name, e);
                stats.failed += 1;
                return ItemOutcome::Failed;
            }
        }
        ItemOutcome::Success
    }

    async fn download_sidecar(
        &self,
        item: &RemoteItem,
        directory: &Path,
        stats: &mut SyncStats,
    ) -> ItemOutcome {
        let path = directory.join(paths::sanitize_name(&item.name));
        match file::download_file(
            &self.client,
            self.remote.as_ref(),
            item,
            &path,
            self.config.dry_run,
            &self.config.retry,
        )
        .await
        {
            Ok(DownloadOutcome::Downloaded) => stats.downloaded += 1,
            Ok(DownloadOutcome::AlreadyComplete) => stats.already_complete += 1,
            Ok(DownloadOutcome::DryRun) => {}
            Err(e) => {
                tracing::error!("Failed to process {}: {}", item.name, e);
                stats.failed += 1;
                return ItemOutcome::Failed;
            }
        }
        ItemOutcome::Success
    }

    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn log_summary(stats: &SyncStats, elapsed: Duration, dry_run: bool) {
    if dry_run {
        tracing::info!("── Dry Run Summary ──");
    } else {
        tracing::info!("── Summary ──");
    }
    tracing::info!("  {} directories", stats.directories);
    tracing::info!(
        "  pointer files: {} written, {} already present",
        stats.strm_written,
        stats.strm_existing
    );
    tracing::info!(
        "  subtitles: {} downloaded, {} already complete",
        stats.downloaded,
        stats.already_complete
    );
    tracing::info!("  {} ignored, {} failed", stats.ignored, stats.failed);
    tracing::info!("  elapsed: {}", format_duration(elapsed));
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

//! Pointer (`.strm`) files for playable media.
//!
//! A pointer file holds a single URL line that a media server hands to its
//! player, so the media bytes stay on the remote drive.

use std::path::{Path, PathBuf};

use tokio::fs;

use super::error::StrmError;
use super::paths;
use crate::remote::{RemoteDirectory, RemoteItem};

/// Metadata fields that must be present before a pointer can be built.
pub const REQUIRED_FIELDS: [&str; 3] = ["Etag", "S3KeyFlag", "Size"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrmOutcome {
    Written,
    /// The pointer file was already present and regeneration is off.
    Existing,
    DryRun,
}

/// Inputs that stay fixed for a whole run.
#[derive(Debug, Clone, Copy)]
pub struct StrmOptions<'a> {
    pub base_url: &'a str,
    pub force_regenerate: bool,
    pub dry_run: bool,
}

/// Build the pointer URL: `<base>/<name>|<size>|<etag>[?s3keyflag=<flag>]`.
///
/// The raw remote name is used verbatim; the direct-link service parses it
/// back out of the path.
pub fn strm_url(base_url: &str, raw_name: &str, size: u64, etag: &str, s3_key_flag: &str) -> String {
    let mut url = format!(
        "{}/{}|{}|{}",
        base_url.trim_end_matches('/'),
        raw_name,
        size,
        etag
    );
    if !s3_key_flag.is_empty() {
        url.push_str("?s3keyflag=");
        url.push_str(s3_key_flag);
    }
    url
}

/// Local path of the pointer file for a media item.
pub fn strm_path(directory: &Path, item: &RemoteItem) -> PathBuf {
    directory.join(paths::strm_file_name(&item.name))
}

/// Write the pointer file for `item` into `directory`, unless it already
/// exists and regeneration is off.
pub async fn emit_strm(
    remote: &dyn RemoteDirectory,
    item: &RemoteItem,
    directory: &Path,
    options: StrmOptions<'_>,
) -> Result<StrmOutcome, StrmError> {
    let path = strm_path(directory, item);

    if !options.force_regenerate && fs::try_exists(&path).await.unwrap_or(false) {
        tracing::debug!(path = %path.display(), "Pointer file already present");
        return Ok(StrmOutcome::Existing);
    }

    if options.dry_run {
        tracing::info!("[DRY RUN] Would write {}", path.display());
        return Ok(StrmOutcome::DryRun);
    }

    let metadata = remote
        .metadata(item.id)
        .await
        .map_err(|source| StrmError::Metadata {
            file: item.name.clone(),
            source,
        })?;

    if let Some(field) = REQUIRED_FIELDS.into_iter().find(|f| !metadata.contains(f)) {
        return Err(StrmError::MissingField {
            file: item.name.clone(),
            field,
        });
    }

    let size = metadata
        .u64("Size")
        .filter(|s| *s > 0)
        .unwrap_or(item.size);
    let url = strm_url(
        options.base_url,
        &item.name,
        size,
        &metadata.string("Etag"),
        &metadata.string("S3KeyFlag"),
    );

    write_atomic(&path, &url).await?;
    tracing::info!("Wrote pointer file {}", path.display());
    Ok(StrmOutcome::Written)
}

/// Write through a `.part` sibling and rename, so an existing pointer file is
/// always complete.
async fn write_atomic(path: &Path, contents: &str) -> Result<(), StrmError> {
    let part_path = path.with_extension(format!("{}.part", paths::STRM_EXTENSION));
    let write_err = |source| StrmError::Write {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&part_path, contents).await.map_err(write_err)?;
    if let Err(e) = fs::rename(&part_path, path).await {
        let _ = fs::remove_file(&part_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

//! 123pan web API payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RemoteItem;

/// Common response envelope: `{"code": 0, "message": "ok", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl ApiEnvelope {
    /// The API reports success as either 0 or 200 depending on the endpoint.
    pub fn is_success(&self) -> bool {
        self.code == 0 || self.code == 200
    }
}

/// Response `data` of `/api/user/sign_in`.
#[derive(Debug, Deserialize)]
pub struct SignInData {
    pub token: String,
}

/// Response `data` of `/api/file/list/new`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileListData {
    #[serde(default)]
    pub info_list: Vec<FileInfo>,
    /// Cursor for the next page; `"-1"` once the listing is exhausted.
    #[serde(default = "end_cursor")]
    pub next: String,
}

fn end_cursor() -> String {
    "-1".to_string()
}

/// Response `data` of `/api/file/download_info`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DownloadInfoData {
    pub download_url: String,
}

/// A file or folder entry from a listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileInfo {
    pub file_id: u64,
    pub file_name: String,
    /// 0 = file, 1 = folder.
    #[serde(rename = "Type")]
    pub kind: u8,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub etag: String,
    #[serde(default)]
    pub s3_key_flag: String,
}

impl From<FileInfo> for RemoteItem {
    fn from(info: FileInfo) -> Self {
        RemoteItem {
            id: info.file_id,
            name: info.file_name,
            is_directory: info.kind != 0,
            size: info.size,
            etag: info.etag,
            s3_key_flag: Some(info.s3_key_flag).filter(|f| !f.is_empty()),
        }
    }
}

/// Request body of `/api/file/download_info`.
#[derive(Debug, Serialize)]
pub struct DownloadInfoRequest<'a> {
    #[serde(rename = "driveId")]
    pub drive_id: u64,
    #[serde(rename = "Etag")]
    pub etag: &'a str,
    #[serde(rename = "FileID")]
    pub file_id: u64,
    #[serde(rename = "FileName")]
    pub file_name: &'a str,
    #[serde(rename = "S3keyFlag")]
    pub s3_key_flag: &'a str,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "Type")]
    pub kind: u8,
}

impl<'a> From<&'a RemoteItem> for DownloadInfoRequest<'a> {
    fn from(item: &'a RemoteItem) -> Self {
        DownloadInfoRequest {
            drive_id: 0,
            etag: &item.etag,
            file_id: item.id,
            file_name: &item.name,
            s3_key_flag: item.s3_key_flag.as_deref().unwrap_or(""),
            size: item.size,
            kind: u8::from(item.is_directory),
        }
    }
}

//! Remote drive access: the listing, metadata and download-URL capability the
//! synchronizer consumes, plus the 123pan web API implementation of it.

pub mod error;
pub mod pan123;
pub mod types;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use error::RemoteError;
pub use pan123::Pan123Client;

/// One child of a remote directory as returned by a listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub id: u64,
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub etag: String,
    pub s3_key_flag: Option<String>,
}

/// Extended per-file metadata, kept as the raw JSON object so that callers
/// can check for the presence of fields the listing does not guarantee.
///
/// The drive is inconsistent about key casing, so lookups accept both the
/// exact spelling and its lower-case form (`Etag` / `etag`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetadata {
    fields: Map<String, Value>,
}

impl FileMetadata {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .get(name)
            .or_else(|| self.fields.get(&name.to_ascii_lowercase()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// String value of a field; numbers are rendered, null is empty.
    pub fn string(&self, name: &str) -> String {
        match self.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Unsigned integer value of a field, accepting numeric strings.
    pub fn u64(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Remote directory capability used by the synchronizer.
///
/// Authentication and transport are entirely the implementor's concern.
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// List the immediate children of a directory, in remote order.
    async fn list(&self, directory_id: u64) -> Result<Vec<RemoteItem>, RemoteError>;

    /// Fetch extended metadata for a single file.
    async fn metadata(&self, file_id: u64) -> Result<FileMetadata, RemoteError>;

    /// Resolve a short-lived direct download URL for a file.
    async fn download_url(&self, item: &RemoteItem) -> Result<String, RemoteError>;
}

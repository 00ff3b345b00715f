//! Shared test doubles: an in-memory remote drive and a loopback HTTP server
//! that serves byte ranges and records what it was asked for.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::remote::{FileMetadata, RemoteDirectory, RemoteError, RemoteItem};

pub fn file_item(id: u64, name: &str, size: u64) -> RemoteItem {
    RemoteItem {
        id,
        name: name.to_string(),
        is_directory: false,
        size,
        etag: format!("etag-{id}"),
        s3_key_flag: None,
    }
}

pub fn dir_item(id: u64, name: &str) -> RemoteItem {
    RemoteItem {
        id,
        name: name.to_string(),
        is_directory: true,
        size: 0,
        etag: String::new(),
        s3_key_flag: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    List(u64),
    Metadata(u64),
    DownloadUrl(u64),
}

fn not_found(id: u64) -> RemoteError {
    RemoteError::Api {
        code: 5066,
        message: format!("file {id} not found"),
    }
}

/// In-memory drive. Unknown directories list as empty; unknown files have
/// no metadata and no download URL.
#[derive(Default)]
pub struct FakeRemote {
    dirs: HashMap<u64, Vec<RemoteItem>>,
    failing_dirs: HashSet<u64>,
    flaky_dirs: Mutex<HashMap<u64, u32>>,
    metadata: HashMap<u64, Value>,
    urls: HashMap<u64, String>,
    calls: Mutex<Vec<RemoteCall>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(mut self, id: u64, items: Vec<RemoteItem>) -> Self {
        self.dirs.insert(id, items);
        self
    }

    /// Listing this directory fails with a non-retryable API error.
    pub fn with_failing_dir(mut self, id: u64) -> Self {
        self.failing_dirs.insert(id);
        self
    }

    /// Listing this directory fails with a transient 503 for the first
    /// `failures` calls, then succeeds.
    pub fn with_flaky_dir(self, id: u64, failures: u32) -> Self {
        self.flaky_dirs.lock().unwrap().insert(id, failures);
        self
    }

    pub fn with_metadata(mut self, id: u64, metadata: Value) -> Self {
        self.metadata.insert(id, metadata);
        self
    }

    pub fn with_download_url(mut self, id: u64, url: String) -> Self {
        self.urls.insert(id, url);
        self
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RemoteCall::List(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn metadata_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RemoteCall::Metadata(_)))
            .count()
    }

    pub fn download_url_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RemoteCall::DownloadUrl(_)))
            .count()
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteDirectory for FakeRemote {
    async fn list(&self, directory_id: u64) -> Result<Vec<RemoteItem>, RemoteError> {
        self.record(RemoteCall::List(directory_id));
        if self.failing_dirs.contains(&directory_id) {
            return Err(RemoteError::Api {
                code: 401,
                message: "token expired".into(),
            });
        }
        if let Some(remaining) = self.flaky_dirs.lock().unwrap().get_mut(&directory_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RemoteError::HttpStatus {
                    status: 503,
                    endpoint: "/api/file/list/new".into(),
                });
            }
        }
        Ok(self.dirs.get(&directory_id).cloned().unwrap_or_default())
    }

    async fn metadata(&self, file_id: u64) -> Result<FileMetadata, RemoteError> {
        self.record(RemoteCall::Metadata(file_id));
        match self.metadata.get(&file_id) {
            Some(Value::Object(map)) => Ok(FileMetadata::new(map.clone())),
            _ => Err(not_found(file_id)),
        }
    }

    async fn download_url(&self, item: &RemoteItem) -> Result<String, RemoteError> {
        self.record(RemoteCall::DownloadUrl(item.id));
        self.urls.get(&item.id).cloned().ok_or_else(|| not_found(item.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub path: String,
    pub range: Option<String>,
}

#[derive(Default)]
struct ServerState {
    files: HashMap<String, Vec<u8>>,
    forced_status: HashMap<String, u16>,
    body_limits: HashMap<String, usize>,
    ignore_range: bool,
    requests: Vec<RecordedRequest>,
}

/// Minimal HTTP/1.1 server on 127.0.0.1 answering `GET` with `Range` support.
pub struct TestServer {
    addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(ServerState::default()));
        let accept_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    let _ = handle_connection(stream, state).await;
                });
            }
        });
        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn serve(&self, path: &str, body: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), body.to_vec());
    }

    /// Answer every request for `path` with `status` and an empty body.
    pub fn force_status(&self, path: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .forced_status
            .insert(path.to_string(), status);
    }

    /// Cut the next response body for `path` short after `max_bytes`.
    pub fn limit_next_body(&self, path: &str, max_bytes: usize) {
        self.state
            .lock()
            .unwrap()
            .body_limits
            .insert(path.to_string(), max_bytes);
    }

    /// Reply with the full body even when a `Range` header is sent.
    pub fn ignore_range(&self) {
        self.state.lock().unwrap().ignore_range = true;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn parse_range_start(range: &str) -> Option<usize> {
    range.strip_prefix("bytes=")?.strip_suffix('-')?.parse().ok()
}

async fn handle_connection(
    mut stream: TcpStream,
    state: Arc<Mutex<ServerState>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf).to_string();
    let mut lines = head.split("\r\n");
    let path = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let range = lines.find_map(|l| {
        let (name, value) = l.split_once(':')?;
        name.eq_ignore_ascii_case("range")
            .then(|| value.trim().to_string())
    });

    let (status, extra_header, body) = {
        let mut state = state.lock().unwrap();
        state.requests.push(RecordedRequest {
            path: path.clone(),
            range: range.clone(),
        });
        let ignore_range = state.ignore_range;
        let limit = state.body_limits.remove(&path);
        if let Some(status) = state.forced_status.get(&path) {
            (*status, String::new(), Vec::new())
        } else if let Some(file) = state.files.get(&path) {
            let start = range
                .as_deref()
                .and_then(parse_range_start)
                .filter(|_| !ignore_range);
            let (status, extra, mut body) = match start {
                Some(start) if start >= file.len() => (416, String::new(), Vec::new()),
                Some(start) => (
                    206,
                    format!(
                        "Content-Range: bytes {}-{}/{}\r\n",
                        start,
                        file.len() - 1,
                        file.len()
                    ),
                    file[start..].to_vec(),
                ),
                None => (200, String::new(), file.clone()),
            };
            if let Some(limit) = limit {
                body.truncate(limit);
            }
            (status, extra, body)
        } else {
            (404, String::new(), Vec::new())
        }
    };

    let response_head = format!(
        "HTTP/1.1 {} Test\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        body.len(),
        extra_header
    );
    stream.write_all(response_head.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.shutdown().await
}

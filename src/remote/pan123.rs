//! 123pan web API client.
//!
//! Signs in with passport/password to obtain a bearer token, then serves the
//! three calls the synchronizer needs: paged directory listing, file info,
//! and download info.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::error::RemoteError;
use super::types::{ApiEnvelope, DownloadInfoData, DownloadInfoRequest, FileListData, SignInData};
use super::{FileMetadata, RemoteDirectory, RemoteItem};

/// Default host for file APIs.
pub const DEFAULT_API_BASE: &str = "https://www.123pan.com/b";

/// Default host for sign-in.
pub const DEFAULT_LOGIN_BASE: &str = "https://login.123pan.com";

/// Entries per listing page.
const PAGE_SIZE: u32 = 100;

/// Cursor value marking the last listing page.
const END_CURSOR: &str = "-1";

pub struct Pan123Client {
    http: Client,
    api_base: String,
}

impl std::fmt::Debug for Pan123Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pan123Client")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("platform", HeaderValue::from_static("web"));
    headers.insert("app-version", HeaderValue::from_static("3"));
    headers
}

impl Pan123Client {
    /// Sign in with passport (phone/e-mail) and password.
    pub async fn sign_in(
        login_base: &str,
        api_base: &str,
        passport: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let anonymous = Client::builder()
            .default_headers(base_headers())
            .timeout(timeout)
            .build()?;
        let endpoint = format!("{}/api/user/sign_in", login_base.trim_end_matches('/'));
        let request = anonymous.post(&endpoint).json(&json!({
            "passport": passport,
            "password": password,
            "remember": true,
        }));
        let data: SignInData = send(request, &endpoint).await.map_err(|e| match e {
            RemoteError::Api { code, message } => {
                RemoteError::Auth(format!("sign-in rejected: {message} (code: {code})"))
            }
            other => other,
        })?;
        tracing::debug!("Signed in to 123pan");
        Self::with_token(api_base, &data.token, timeout)
    }

    /// Build a client from an existing bearer token.
    pub fn with_token(api_base: &str, token: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let mut headers = base_headers();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| RemoteError::Auth("token contains invalid header characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn list_page(&self, directory_id: u64, page: u32) -> Result<FileListData, RemoteError> {
        let endpoint = self.endpoint("/api/file/list/new");
        let request = self.http.get(&endpoint).query(&[
            ("driveId", "0".to_string()),
            ("limit", PAGE_SIZE.to_string()),
            ("next", "0".to_string()),
            ("orderBy", "file_id".to_string()),
            ("orderDirection", "asc".to_string()),
            ("parentFileId", directory_id.to_string()),
            ("trashed", "false".to_string()),
            ("SearchData", String::new()),
            ("Page", page.to_string()),
            ("OnlyLookAbnormalFile", "0".to_string()),
        ]);
        send(request, &endpoint).await
    }
}

/// Send a request and unwrap the `{code, message, data}` envelope.
async fn send<T: DeserializeOwned>(request: RequestBuilder, endpoint: &str) -> Result<T, RemoteError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::HttpStatus {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
        });
    }
    let envelope: ApiEnvelope = response.json().await?;
    unwrap_envelope(envelope, endpoint)
}

fn unwrap_envelope<T: DeserializeOwned>(envelope: ApiEnvelope, endpoint: &str) -> Result<T, RemoteError> {
    if !envelope.is_success() {
        return Err(RemoteError::Api {
            code: envelope.code,
            message: envelope.message,
        });
    }
    serde_json::from_value(envelope.data).map_err(|e| RemoteError::MalformedResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Pull the single entry out of a `/api/file/info` response.
fn first_info(data: Value, endpoint: &str) -> Result<FileMetadata, RemoteError> {
    let malformed = |reason: &str| RemoteError::MalformedResponse {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };
    match data.get("infoList").and_then(Value::as_array).and_then(|l| l.first()) {
        Some(Value::Object(map)) => Ok(FileMetadata::new(map.clone())),
        Some(_) => Err(malformed("infoList entry is not an object")),
        None => Err(malformed("empty infoList")),
    }
}

#[async_trait]
impl RemoteDirectory for Pan123Client {
    async fn list(&self, directory_id: u64) -> Result<Vec<RemoteItem>, RemoteError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let data = self.list_page(directory_id, page).await?;
            let fetched = data.info_list.len();
            items.extend(data.info_list.into_iter().map(RemoteItem::from));
            if data.next == END_CURSOR || fetched == 0 {
                break;
            }
            page += 1;
        }
        tracing::debug!(directory_id, count = items.len(), pages = page, "Listed directory");
        Ok(items)
    }

    async fn metadata(&self, file_id: u64) -> Result<FileMetadata, RemoteError> {
        let endpoint = self.endpoint("/api/file/info");
        let request = self
            .http
            .post(&endpoint)
            .json(&json!({"fileIdList": [{"fileId": file_id}]}));
        let data: Value = send(request, &endpoint).await?;
        first_info(data, &endpoint)
    }

    async fn download_url(&self, item: &RemoteItem) -> Result<String, RemoteError> {
        let endpoint = self.endpoint("/api/file/download_info");
        let request = self
            .http
            .post(&endpoint)
            .json(&DownloadInfoRequest::from(item));
        let data: DownloadInfoData = send(request, &endpoint).await?;
        Ok(data.download_url)
    }
}

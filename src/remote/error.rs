use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("API response error: {message} (code: {code})")]
    Api { code: i64, message: String },
    #[error("HTTP error {status} from {endpoint}")]
    HttpStatus { status: u16, endpoint: String },
    #[error("Malformed API response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },
    #[error("Not signed in: {0}")]
    Auth(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RemoteError {
    /// Whether a failed API call is worth repeating.
    ///
    /// Transport failures, throttling and server-side errors are transient.
    /// Rejections by the API itself (bad token, unknown file) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Http(_) => true,
            RemoteError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            RemoteError::Api { code, .. } => *code == 429,
            RemoteError::MalformedResponse { .. } | RemoteError::Auth(_) | RemoteError::Json(_) => {
                false
            }
        }
    }
}

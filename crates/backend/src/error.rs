use session::{AuthError, DirectoryWriteError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("invalid backend url `{0}`")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; `message` is the backend's own text.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("not signed in")]
    NoSession,

    #[error("token cache: {0}")]
    TokenCache(#[from] std::io::Error),
}

impl BackendError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Api { status: 401 | 403, .. })
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Api { message, .. } => AuthError::Rejected(message),
            other => AuthError::Transport(other.to_string()),
        }
    }
}

impl From<BackendError> for DirectoryWriteError {
    fn from(err: BackendError) -> Self {
        DirectoryWriteError::new(err.to_string())
    }
}

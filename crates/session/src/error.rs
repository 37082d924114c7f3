use thiserror::Error;

use crate::Session;

/// Sign-in / sign-up / sign-out failures reported by the identity provider.
///
/// `Rejected` carries the provider's own message, which is shown to the user
/// unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Transport(String),
}

/// The profile row insert after a successful sign-up failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DirectoryWriteError {
    pub message: String,
}

impl DirectoryWriteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignUpError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The identity exists (and `session` reflects it), but the user
    /// directory has no profile row for it.
    #[error("{source}")]
    Directory {
        session: Session,
        source: DirectoryWriteError,
    },
}

/// The current-user lookup behind the route guard failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not resolve session: {0}")]
pub struct SessionResolutionError(#[from] pub AuthError);

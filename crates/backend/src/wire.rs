//! JSON shapes of the auth and REST endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use session::User;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub(crate) struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<WireUser> for User {
    fn from(user: WireUser) -> Self {
        User::new(user.id, user.email.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: WireUser,
}

/// Sign-up answers with a full session when no confirmation is required and
/// with the bare user otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpResponse {
    Session(TokenResponse),
    User(WireUser),
}

/// Tokens kept between requests (and between runs, if a cache file is set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: User,
}

impl From<TokenResponse> for StoredSession {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: token.user.into(),
        }
    }
}

/// Human-readable message out of an error body.
///
/// Auth endpoints use `error_description` or `msg`, the REST layer uses
/// `message`; anything else falls back to the raw body or the status.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(Value::String(text)) = fields.get(key) {
                if !text.is_empty() {
                    return text.clone();
                }
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("request failed with status {status}")
    } else {
        body.to_owned()
    }
}

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use session::{
    AuthError, AuthEvent, DirectoryWriteError, EventHub, IdentityProvider, SignUp, Subscription,
    User, UserDirectory, UserId,
};
use tracing::{debug, info, warn};

use crate::wire::{
    error_message, Credentials, RefreshRequest, SignUpResponse, StoredSession, TokenResponse,
    WireUser,
};
use crate::{BackendError, BackendSettings};

/// Client for the auth (`/auth/v1`) and REST (`/rest/v1`) endpoints.
///
/// Holds at most one signed-in session. With a token file configured the
/// session survives process restarts.
pub struct BackendClient {
    http: Client,
    base: Url,
    anon_key: String,
    user_table: String,
    stored: RwLock<Option<StoredSession>>,
    token_file: Option<PathBuf>,
    hub: EventHub,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let base = base_url(&settings.url)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http,
            base,
            anon_key: settings.anon_key.clone(),
            user_table: settings.user_table.clone(),
            stored: RwLock::new(None),
            token_file: None,
            hub: EventHub::new(),
        })
    }

    /// Persist the session to `path` and restore it from there if present.
    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<StoredSession>(&text) {
                Ok(stored) => {
                    debug!(path = %path.display(), "restored stored session");
                    *self.stored.get_mut() = Some(stored);
                }
                Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable token file"),
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        self.token_file = Some(path);
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|_| BackendError::InvalidUrl(format!("{}{}", self.base, path)))
    }

    pub fn table_url(&self, table: &str) -> Result<Url, BackendError> {
        self.endpoint(&format!("rest/v1/{table}"))
    }

    pub fn stored_session(&self) -> Option<StoredSession> {
        self.stored.read().clone()
    }

    /// Insert one row into `table`, authorised as the signed-in user if any.
    pub async fn insert_row<T>(&self, table: &str, row: &T) -> Result<(), BackendError>
    where
        T: Serialize + ?Sized,
    {
        let url = self.table_url(table)?;
        debug!(%table, "inserting row");
        let request = self
            .authorized(self.http.post(url))
            .header("Prefer", "return=minimal")
            .json(row);
        self.send(request).await.map(drop)
    }

    fn bearer(&self) -> String {
        match self.stored.read().as_ref() {
            Some(stored) => stored.access_token.clone(),
            None => self.anon_key.clone(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    /// Send and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            let message = error_message(status.as_u16(), &body);
            debug!(status = status.as_u16(), %message, "backend rejected request");
            Err(BackendError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let body = self.send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_user(&self) -> Result<User, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        let user: WireUser = self.send_json(self.authorized(self.http.get(url))).await?;
        Ok(user.into())
    }

    /// Exchange the refresh token for a new session. `false` if there is none.
    async fn refresh(&self) -> Result<bool, BackendError> {
        let Some(refresh_token) = self
            .stored
            .read()
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
        else {
            return Ok(false);
        };
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");
        let request = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            });
        let token: TokenResponse = self.send_json(request).await?;
        self.store(Some(token.into()))?;
        debug!("access token refreshed");
        self.hub.emit(AuthEvent::TokenRefreshed);
        Ok(true)
    }

    fn store(&self, session: Option<StoredSession>) -> Result<(), BackendError> {
        if let Some(path) = &self.token_file {
            match &session {
                Some(stored) => {
                    if let Some(dir) = path.parent() {
                        fs::create_dir_all(dir)?;
                    }
                    fs::write(path, serde_json::to_string_pretty(stored)?)?;
                }
                None => match fs::remove_file(path) {
                    Err(err) if err.kind() != ErrorKind::NotFound => return Err(err.into()),
                    _ => {}
                },
            }
        }
        *self.stored.write() = session;
        Ok(())
    }

    fn clear(&self) {
        if let Err(err) = self.store(None) {
            warn!(error = %err, "could not remove token file");
            self.stored.write().take();
        }
    }
}

fn base_url(raw: &str) -> Result<Url, BackendError> {
    let mut url = Url::parse(raw.trim()).map_err(|_| BackendError::InvalidUrl(raw.to_owned()))?;
    if url.cannot_be_a_base() {
        return Err(BackendError::InvalidUrl(raw.to_owned()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl IdentityProvider for BackendClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let request = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&Credentials { email, password });
        let token: TokenResponse = self.send_json(request).await?;
        let stored = StoredSession::from(token);
        let user = stored.user.clone();
        self.store(Some(stored))?;
        info!(user_id = %user.id, "signed in");
        self.hub.emit(AuthEvent::SignedIn);
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, AuthError> {
        let url = self.endpoint("auth/v1/signup")?;
        let request = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&Credentials { email, password });
        match self.send_json::<SignUpResponse>(request).await? {
            SignUpResponse::Session(token) => {
                let stored = StoredSession::from(token);
                let user = stored.user.clone();
                self.store(Some(stored))?;
                info!(user_id = %user.id, "signed up");
                self.hub.emit(AuthEvent::SignedIn);
                Ok(SignUp {
                    user: Some(user),
                    session_established: true,
                })
            }
            SignUpResponse::User(user) => {
                info!(user_id = %user.id, "signed up, confirmation pending");
                Ok(SignUp {
                    user: Some(user.into()),
                    session_established: false,
                })
            }
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.stored.read().is_none() {
            return Ok(());
        }
        let result = match self.endpoint("auth/v1/logout") {
            Ok(url) => self.send(self.authorized(self.http.post(url))).await.map(drop),
            Err(err) => Err(err),
        };
        self.clear();
        self.hub.emit(AuthEvent::SignedOut);
        result.map_err(AuthError::from)
    }

    async fn current_user(&self) -> Result<Option<User>, AuthError> {
        if self.stored.read().is_none() {
            return Ok(None);
        }
        match self.fetch_user().await {
            Ok(user) => return Ok(Some(user)),
            Err(err) if err.is_unauthorized() => {
                debug!("access token rejected; trying refresh");
            }
            Err(err) => return Err(err.into()),
        }
        match self.refresh().await {
            Ok(true) => match self.fetch_user().await {
                Ok(user) => return Ok(Some(user)),
                Err(err) if !err.is_unauthorized() => return Err(err.into()),
                Err(_) => {}
            },
            Ok(false) => {}
            // refresh token rejected
            Err(BackendError::Api { .. }) => {}
            Err(err) => return Err(err.into()),
        }
        info!("stored session expired");
        self.clear();
        self.hub.emit(AuthEvent::SignedOut);
        Ok(None)
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }
}

#[async_trait]
impl UserDirectory for BackendClient {
    async fn insert(&self, id: UserId, email: &str) -> Result<(), DirectoryWriteError> {
        let row = json!({ "id": id, "email": email });
        self.insert_row(&self.user_table, &row)
            .await
            .map_err(DirectoryWriteError::from)
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base", &self.base.as_str())
            .field("signed_in", &self.stored.read().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> BackendClient {
        BackendClient::new(&BackendSettings {
            url: url.into(),
            ..BackendSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoints_keep_base_path() {
        let c = client("https://xyz.supabase.co");
        assert_eq!(
            c.endpoint("auth/v1/user").unwrap().as_str(),
            "https://xyz.supabase.co/auth/v1/user"
        );
        let proxied = client("http://localhost:8080/api");
        assert_eq!(
            proxied.table_url("reports").unwrap().as_str(),
            "http://localhost:8080/api/rest/v1/reports"
        );
    }

    #[test]
    fn rejects_non_urls() {
        let err = BackendClient::new(&BackendSettings {
            url: "not a url".into(),
            ..BackendSettings::default()
        })
        .unwrap_err();
        assert!(matches!(err, BackendError::InvalidUrl(_)));
    }

    #[test]
    fn api_errors_become_rejections() {
        let err = AuthError::from(BackendError::Api {
            status: 400,
            message: "Invalid login credentials".into(),
        });
        assert_eq!(err, AuthError::Rejected("Invalid login credentials".into()));
        let err = AuthError::from(BackendError::NoSession);
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[tokio::test]
    async fn signed_out_client_has_no_user() {
        let c = client("http://127.0.0.1:9");
        assert_eq!(c.current_user().await.unwrap(), None);
        assert!(c.sign_out().await.is_ok());
    }

    #[test]
    fn token_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let stored = StoredSession {
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            user: User::new(uuid::Uuid::new_v4(), "a@b.co"),
        };
        fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let c = client("http://localhost:54321")
            .with_token_file(&path)
            .unwrap();
        assert_eq!(c.stored_session(), Some(stored));

        c.clear();
        assert!(!path.exists());
        assert!(c.stored_session().is_none());
    }

    #[test]
    fn unreadable_token_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{").unwrap();
        let c = client("http://localhost:54321")
            .with_token_file(&path)
            .unwrap();
        assert!(c.stored_session().is_none());
    }
}

//! Process-wide session store.
//!
//! Holds the single `Session` cell (a `watch` channel: one writer, many
//! readers), performs sign-in / sign-up / sign-out against the identity
//! provider and keeps the cached user query in step with every transition.
//!
//! The provider's auth events are consumed by a listener task started with
//! [`SessionStore::start`]. The task holds only a weak reference to the store
//! and is aborted on [`SessionStore::shutdown`] or when the last handle is
//! dropped, which releases the subscription.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    AuthError, AuthEvent, IdentityProvider, Session, SignUpError, UserDirectory, UserQuery,
};

#[derive(Debug, Default)]
enum Listener {
    #[default]
    Idle,
    Running(JoinHandle<()>),
    Closed,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<dyn UserDirectory>,
    query: Arc<UserQuery>,
    session: watch::Sender<Session>,
    listener: Mutex<Listener>,
}

impl Inner {
    /// Every transition invalidates the cached user before readers are woken.
    fn transition(&self, next: Session) {
        self.query.invalidate();
        let previous = self.session.send_replace(next);
        let current = self.session.borrow();
        if previous != *current {
            info!(from = previous.label(), to = current.label(), "session changed");
        }
    }

    async fn on_auth_event(&self, event: AuthEvent) {
        debug!(?event, "auth event");
        match self.provider.current_user().await {
            Ok(user) => self.transition(Session::from_user(user)),
            Err(err) => {
                // keep the current value but never serve a fresh cached user
                warn!(?event, error = %err, "could not recompute session after auth event");
                self.query.invalidate();
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Listener::Running(task) = std::mem::take(self.listener.get_mut()) {
            task.abort();
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>, directory: Arc<dyn UserDirectory>) -> Self {
        let query = Arc::new(UserQuery::new(provider.clone()));
        let (session, _) = watch::channel(Session::Unknown);
        Self {
            inner: Arc::new(Inner {
                provider,
                directory,
                query,
                session,
                listener: Mutex::new(Listener::Idle),
            }),
        }
    }

    /// Subscribe to provider events. Must be called inside a tokio runtime.
    ///
    /// Returns `false` if the store is already listening or was shut down;
    /// a store subscribes at most once in its lifetime.
    pub fn start(&self) -> bool {
        let mut listener = self.inner.listener.lock();
        if !matches!(*listener, Listener::Idle) {
            debug!("session listener already started");
            return false;
        }
        let mut subscription = self.inner.provider.subscribe();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.on_auth_event(event).await;
            }
            subscription.unsubscribe();
        });
        *listener = Listener::Running(task);
        true
    }

    /// Stop listening for provider events.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.inner.listener.lock(), Listener::Closed);
        if let Listener::Running(task) = previous {
            task.abort();
            debug!("session listener stopped");
        }
    }

    pub fn is_listening(&self) -> bool {
        matches!(*self.inner.listener.lock(), Listener::Running(_))
    }

    /// Resolve the provider's current state into the session cell.
    pub async fn resolve(&self) -> Result<Session, AuthError> {
        let user = self.inner.provider.current_user().await?;
        let session = Session::from_user(user);
        self.inner.transition(session.clone());
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        info!(%email, "signing in");
        let user = self
            .inner
            .provider
            .sign_in_with_password(email, password)
            .await
            .inspect_err(|err| warn!(%email, error = %err, "sign-in rejected"))?;
        let session = Session::Authenticated(user);
        self.inner.transition(session.clone());
        Ok(session)
    }

    /// Create an identity and its profile row.
    ///
    /// The identity is not rolled back if the profile insert fails; the
    /// returned `SignUpError::Directory` carries the session as it is after
    /// the identity step.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, SignUpError> {
        info!(%email, "signing up");
        let outcome = self
            .inner
            .provider
            .sign_up(email, password)
            .await
            .inspect_err(|err| warn!(%email, error = %err, "sign-up rejected"))?;

        let session = match (&outcome.user, outcome.session_established) {
            (Some(user), true) => {
                let session = Session::Authenticated(user.clone());
                self.inner.transition(session.clone());
                session
            }
            _ => {
                debug!(%email, "sign-up did not establish a session");
                self.get_session()
            }
        };

        if let Some(user) = &outcome.user {
            if let Err(source) = self.inner.directory.insert(user.id, &user.email).await {
                warn!(%email, user_id = %user.id, error = %source, "profile insert failed");
                return Err(SignUpError::Directory { session, source });
            }
        }
        Ok(session)
    }

    /// End the session. The local state becomes `Anonymous` even when the
    /// provider call fails; that failure is still returned.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.inner.provider.sign_out().await;
        if let Err(err) = &result {
            warn!(error = %err, "sign-out failed at provider; clearing local session anyway");
        }
        self.inner.transition(Session::Anonymous);
        result
    }

    pub fn get_session(&self) -> Session {
        self.inner.session.borrow().clone()
    }

    /// Receiver that observes every session change.
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.inner.session.subscribe()
    }

    pub fn query(&self) -> Arc<UserQuery> {
        self.inner.query.clone()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.inner.session.borrow())
            .field("listener", &*self.inner.listener.lock())
            .finish_non_exhaustive()
    }
}

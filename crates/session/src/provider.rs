//! Seams to the outside world: the identity provider that owns credentials
//! and tokens, and the user directory that stores profile rows.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use crate::{AuthError, DirectoryWriteError, User, UserId};

/// Authentication change reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Result of a sign-up call.
///
/// Providers that require email confirmation create the identity without
/// establishing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    pub user: Option<User>,
    pub session_established: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The identity of the current token, if any.
    async fn current_user(&self) -> Result<Option<User>, AuthError>;

    /// Register for auth change events. Dropping the returned handle releases
    /// the registration.
    fn subscribe(&self) -> Subscription;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn insert(&self, id: UserId, email: &str) -> Result<(), DirectoryWriteError>;
}

/// Receiving end of an auth event registration.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<AuthEvent>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving. Events already queued are discarded.
    pub fn unsubscribe(mut self) {
        self.rx.close();
    }
}

/// Fan-out of auth events to every live [`Subscription`].
///
/// Closed subscriptions are pruned on the next emit.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<AuthEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        Subscription { rx }
    }

    pub fn emit(&self, event: AuthEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event).is_ok());
        trace!(?event, receivers = subscribers.len(), "auth event emitted");
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

//! In-process identity provider and user directory.
//!
//! Used for offline runs and tests. Both sides support failure injection and
//! count their calls so tests can assert on round trips.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use crate::{
    AuthError, AuthEvent, DirectoryWriteError, EventHub, IdentityProvider, SignUp, Subscription,
    User, UserDirectory, UserId,
};

const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    id: UserId,
    password: String,
}

/// Pauses the next `current_user` lookup until released.
#[derive(Debug, Clone, Default)]
pub struct Hold {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Hold {
    /// Resolves once the held lookup has started.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<User>>,
    hub: EventHub,
    offline: AtomicBool,
    confirm_email: AtomicBool,
    hold: Mutex<Option<Hold>>,
    sign_in_calls: AtomicUsize,
    sign_up_calls: AtomicUsize,
    current_user_calls: AtomicUsize,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.accounts.lock().insert(
            email.to_owned(),
            Account {
                id: Uuid::new_v4(),
                password: password.to_owned(),
            },
        );
        self
    }

    /// Every call fails with a transport error while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Sign-ups create the identity but no session while set.
    pub fn require_email_confirmation(&self, required: bool) {
        self.confirm_email.store(required, Ordering::SeqCst);
    }

    pub fn hold_current_user(&self) -> Hold {
        let hold = Hold::default();
        *self.hold.lock() = Some(hold.clone());
        hold
    }

    /// Drop the current token as if it expired, and tell subscribers.
    pub fn expire_session(&self) {
        self.current.lock().take();
        self.hub.emit(AuthEvent::SignedOut);
    }

    pub fn emit(&self, event: AuthEvent) {
        self.hub.emit(event);
    }

    pub fn account_id(&self, email: &str) -> Option<UserId> {
        self.accounts.lock().get(email).map(|a| a.id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn sign_up_calls(&self) -> usize {
        self.sign_up_calls.load(Ordering::SeqCst)
    }

    pub fn current_user_calls(&self) -> usize {
        self.current_user_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(AuthError::Transport("identity provider unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let id = match self.accounts.lock().get(email) {
            Some(account) if account.password == password => account.id,
            _ => return Err(AuthError::Rejected("Invalid login credentials".into())),
        };
        let user = User::new(id, email);
        *self.current.lock() = Some(user.clone());
        debug!(%email, "memory provider: signed in");
        self.hub.emit(AuthEvent::SignedIn);
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, AuthError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::Rejected(
                "Password should be at least 6 characters.".into(),
            ));
        }
        let id = {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(email) {
                return Err(AuthError::Rejected("User already registered".into()));
            }
            let id = Uuid::new_v4();
            accounts.insert(
                email.to_owned(),
                Account {
                    id,
                    password: password.to_owned(),
                },
            );
            id
        };
        let user = User::new(id, email);

        if self.confirm_email.load(Ordering::SeqCst) {
            debug!(%email, "memory provider: signed up, awaiting confirmation");
            return Ok(SignUp {
                user: Some(user),
                session_established: false,
            });
        }

        *self.current.lock() = Some(user.clone());
        debug!(%email, "memory provider: signed up");
        self.hub.emit(AuthEvent::SignedIn);
        Ok(SignUp {
            user: Some(user),
            session_established: true,
        })
    }

    /// The local session is dropped even when the provider is unreachable.
    async fn sign_out(&self) -> Result<(), AuthError> {
        self.current.lock().take();
        self.hub.emit(AuthEvent::SignedOut);
        self.check_online()
    }

    async fn current_user(&self) -> Result<Option<User>, AuthError> {
        self.current_user_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().take();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        self.check_online()?;
        Ok(self.current.lock().clone())
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }
}

/// Profile rows keyed by user id.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    rows: Mutex<Vec<User>>,
    failure: Mutex<Option<String>>,
    inserts: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert fail with `message` until cleared with `None`.
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_owned);
    }

    pub fn rows(&self) -> Vec<User> {
        self.rows.lock().clone()
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn insert(&self, id: UserId, email: &str) -> Result<(), DirectoryWriteError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().clone() {
            return Err(DirectoryWriteError::new(message));
        }
        let mut rows = self.rows.lock();
        if rows.iter().any(|row| row.id == id) {
            return Err(DirectoryWriteError::new(
                "duplicate key value violates unique constraint \"user_pkey\"",
            ));
        }
        rows.push(User::new(id, email));
        Ok(())
    }
}

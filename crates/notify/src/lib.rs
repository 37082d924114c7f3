//! Notification channel for transient, non-blocking messages ("toasts").
//!
//! Producers hold a cheap, cloneable [`Notifier`] and fire messages without
//! waiting for anyone to display them. A single [`NotificationCenter`] owns the
//! receiving end, keeps the currently visible notifications and expires them
//! after their time-to-live.
//!
//! There is no retry and no queue policy beyond "most recent call wins
//! visually": [`NotificationCenter::latest`] always returns the newest entry.
//!
//! ```ignore
//! let (notifier, mut center) = notify::channel(Duration::from_secs(4));
//! notifier.success("You are now logged in and can create a report.");
//! center.pump();
//! assert_eq!(center.latest().unwrap().message, "You are now logged in and can create a report.");
//! ```

use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

new_key_type! { pub struct NotificationKey; }

/// Default time a notification stays visible.
pub const DEFAULT_TTL: Duration = Duration::from_millis(4000);

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

impl NotificationKind {
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
        }
    }
}

/// Message as sent by a producer, before the center stamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: NotificationKind,
    pub message: String,
    /// Optional secondary block (e.g. the pretty-printed values of a submitted form).
    pub description: Option<String>,
}

impl Toast {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            description: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, message)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A notification currently held by the [`NotificationCenter`].
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationKey,
    pub kind: NotificationKind,
    pub message: String,
    pub description: Option<String>,
    pub created_at: Instant,
    pub ttl: Duration,
    seq: u64,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }
}

/// Producer side of the channel.
///
/// Sending never blocks and never fails from the caller's point of view; if no
/// center is attached anymore the message is dropped and logged at debug level.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Toast>,
}

impl Notifier {
    pub fn notify(&self, toast: Toast) {
        if let Err(e) = self.tx.send(toast) {
            debug!(message = %e.0.message, "notification dropped; no center attached");
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(Toast::success(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(Toast::error(message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(Toast::info(message));
    }

    /// A notifier whose messages go nowhere. Useful for headless flows.
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }
}

/// Create a connected notifier / center pair.
pub fn channel(ttl: Duration) -> (Notifier, NotificationCenter) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Notifier { tx },
        NotificationCenter {
            rx,
            active: SlotMap::with_key(),
            ttl,
            next_seq: 0,
        },
    )
}

/// Single consumer of the notification channel.
pub struct NotificationCenter {
    rx: mpsc::UnboundedReceiver<Toast>,
    active: SlotMap<NotificationKey, Notification>,
    ttl: Duration,
    next_seq: u64,
}

impl NotificationCenter {
    /// Move every pending toast into the active set. Returns how many arrived.
    pub fn pump(&mut self) -> usize {
        self.pump_at(Instant::now())
    }

    pub fn pump_at(&mut self, now: Instant) -> usize {
        let mut received = 0;
        while let Ok(toast) = self.rx.try_recv() {
            self.insert(toast, now);
            received += 1;
        }
        received
    }

    /// Wait for the next toast. Returns `None` once every notifier is gone.
    pub async fn recv(&mut self) -> Option<NotificationKey> {
        let toast = self.rx.recv().await?;
        Some(self.insert(toast, Instant::now()))
    }

    fn insert(&mut self, toast: Toast, now: Instant) -> NotificationKey {
        let seq = self.next_seq;
        self.next_seq += 1;
        let ttl = self.ttl;
        match toast.kind {
            NotificationKind::Error => warn!(message = %toast.message, "notification"),
            _ => info!(kind = toast.kind.label(), message = %toast.message, "notification"),
        }
        self.active.insert_with_key(|id| Notification {
            id,
            kind: toast.kind,
            message: toast.message,
            description: toast.description,
            created_at: now,
            ttl,
            seq,
        })
    }

    pub fn get(&self, key: NotificationKey) -> Option<&Notification> {
        self.active.get(key)
    }

    /// The notification that wins visually: the most recently received one.
    pub fn latest(&self) -> Option<&Notification> {
        self.active.values().max_by_key(|n| n.seq)
    }

    /// Active notifications, newest first.
    pub fn active(&self) -> Vec<&Notification> {
        let mut all: Vec<&Notification> = self.active.values().collect();
        all.sort_by(|a, b| b.seq.cmp(&a.seq));
        all
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn dismiss(&mut self, key: NotificationKey) -> Option<Notification> {
        self.active.remove(key)
    }

    /// Drop every notification whose TTL elapsed at `now`. Returns how many were removed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.active.len();
        self.active.retain(|_, n| !n.is_expired(now));
        before - self.active.len()
    }
}

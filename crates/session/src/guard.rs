//! Route guard for views that require an authenticated session.
//!
//! The guard resolves the session through the cached user query and either
//! hands the user to the view initializer or redirects to the login route.
//! Anything other than a positively resolved identity is treated as a denial.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Session, User, UserQuery};

/// Receives navigation requests from the guard and the application flows.
pub trait Navigator: Send + Sync {
    /// Replace the current location (no history entry for the denied view).
    fn redirect_to(&self, path: &str);

    /// Push a new location.
    fn navigate_to(&self, path: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Anonymous,
    /// The lookup failed; the message is kept for logs only.
    ResolutionFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    pub reason: DenyReason,
}

/// What happened to a guarded view.
#[derive(Debug, PartialEq, Eq)]
pub enum GuardOutcome<V> {
    Rendered(V),
    Redirected(Redirect),
    /// The view was torn down before the decision arrived.
    Discarded,
}

impl<V> GuardOutcome<V> {
    pub fn is_rendered(&self) -> bool {
        matches!(self, GuardOutcome::Rendered(_))
    }
}

pub struct RouteGuard {
    query: Arc<UserQuery>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
}

impl RouteGuard {
    pub fn new(
        query: Arc<UserQuery>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            query,
            navigator,
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Resolve the session and decide, without navigating.
    pub async fn check(&self) -> Result<User, Redirect> {
        let reason = match self.query.get().await {
            Ok(Session::Authenticated(user)) => return Ok(user),
            Ok(other) => {
                debug!(session = other.label(), "guard denied");
                DenyReason::Anonymous
            }
            Err(err) => {
                warn!(error = %err, "guard could not resolve session; denying");
                DenyReason::ResolutionFailed(err.to_string())
            }
        };
        Err(Redirect {
            to: self.login_path.clone(),
            reason,
        })
    }

    /// Guard a view.
    ///
    /// `init` runs only for an authenticated user. If `unmounted` is cancelled
    /// before the decision is made, nothing runs and no navigation happens.
    pub async fn enter<V, F>(&self, unmounted: &CancellationToken, init: F) -> GuardOutcome<V>
    where
        F: FnOnce(User) -> V,
    {
        let decision = tokio::select! {
            biased;
            _ = unmounted.cancelled() => return GuardOutcome::Discarded,
            decision = self.check() => decision,
        };
        if unmounted.is_cancelled() {
            return GuardOutcome::Discarded;
        }
        match decision {
            Ok(user) => GuardOutcome::Rendered(init(user)),
            Err(redirect) => {
                info!(to = %redirect.to, "redirecting unauthenticated visitor");
                self.navigator.redirect_to(&redirect.to);
                GuardOutcome::Redirected(redirect)
            }
        }
    }
}

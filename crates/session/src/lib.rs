//! Session handling: the process-wide session store, the cached
//! current-user query and the route guard built on top of it.

mod error;
mod guard;
pub mod memory;
mod model;
mod provider;
mod query;
mod store;

pub use error::{AuthError, DirectoryWriteError, SessionResolutionError, SignUpError};
pub use guard::{DenyReason, GuardOutcome, Navigator, Redirect, RouteGuard};
pub use model::{Session, User, UserId};
pub use provider::{AuthEvent, EventHub, IdentityProvider, SignUp, Subscription, UserDirectory};
pub use query::{CachedUserEntry, Freshness, UserQuery, CURRENT_USER_KEY};
pub use store::SessionStore;

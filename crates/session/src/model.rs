use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// Identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

impl User {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// Authentication status of the process.
///
/// Starts as `Unknown` and only leaves it once the session store resolved the
/// provider's state for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Unknown,
    Anonymous,
    Authenticated(User),
}

impl Session {
    pub fn from_user(user: Option<User>) -> Self {
        match user {
            Some(user) => Session::Authenticated(user),
            None => Session::Anonymous,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Session::Unknown => "unknown",
            Session::Anonymous => "anonymous",
            Session::Authenticated(_) => "authenticated",
        }
    }
}

//! Sign-in and sign-up actions run by the credential forms.

use notify::Toast;
use session::{AuthError, SessionStore, SignUpError};

use crate::config::RouteSettings;

pub const LOGIN_SUCCESS: &str = "You are now logged in and can create a report.";
pub const SIGNUP_SUCCESS: &str = "You are now signed up and can create a report.";

/// Mode of the combined credentials form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    SignUp,
}

impl AuthMode {
    pub fn toggle(self) -> Self {
        match self {
            AuthMode::Login => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::Login,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AuthMode::Login => "Log in",
            AuthMode::SignUp => "Create account",
        }
    }

    pub fn submit_label(self) -> &'static str {
        match self {
            AuthMode::Login => "Log in",
            AuthMode::SignUp => "Sign up",
        }
    }

    /// Text of the link that switches to the other mode.
    pub fn switch_prompt(self) -> &'static str {
        match self {
            AuthMode::Login => "Don't have account? Sign up",
            AuthMode::SignUp => "Have account? Log in",
        }
    }

    pub fn route(self, routes: &RouteSettings) -> &str {
        match self {
            AuthMode::Login => &routes.login,
            AuthMode::SignUp => &routes.signup,
        }
    }

    pub fn from_route(path: &str, routes: &RouteSettings) -> Option<Self> {
        if path == routes.login {
            Some(AuthMode::Login)
        } else if path == routes.signup {
            Some(AuthMode::SignUp)
        } else {
            None
        }
    }
}

pub async fn sign_in(store: &SessionStore, email: &str, password: &str) -> Result<Toast, AuthError> {
    store.sign_in(email, password).await?;
    Ok(Toast::success(LOGIN_SUCCESS))
}

/// A failed profile insert is returned as the error even though the
/// identity was created.
pub async fn sign_up(
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<Toast, SignUpError> {
    store.sign_up(email, password).await?;
    Ok(Toast::success(SIGNUP_SUCCESS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_round_trips() {
        assert_eq!(AuthMode::Login.toggle(), AuthMode::SignUp);
        assert_eq!(AuthMode::Login.toggle().toggle(), AuthMode::Login);
    }

    #[test]
    fn routes_map_to_modes() {
        let routes = RouteSettings::default();
        assert_eq!(AuthMode::SignUp.route(&routes), "/auth/signup");
        assert_eq!(
            AuthMode::from_route("/auth/login", &routes),
            Some(AuthMode::Login)
        );
        assert_eq!(AuthMode::from_route("/reports", &routes), None);
    }

    #[test]
    fn labels_follow_mode() {
        assert_eq!(AuthMode::Login.title(), "Log in");
        assert_eq!(AuthMode::SignUp.title(), "Create account");
        assert_eq!(AuthMode::SignUp.submit_label(), "Sign up");
    }
}

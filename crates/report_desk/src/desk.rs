//! Wiring of forms, session, guard and notifications into one desk.

use std::sync::Arc;

use backend::BackendClient;
use forms::{Form, SubmitOutcome};
use notify::Notifier;
use session::memory::{MemoryDirectory, MemoryIdentityProvider};
use session::{
    AuthError, GuardOutcome, IdentityProvider, Navigator, RouteGuard, SessionStore, User,
    UserDirectory,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::{self, AuthMode};
use crate::config::RouteSettings;
use crate::models::{BugReport, LoginForm, SignupForm};
use crate::navigation::HistoryNavigator;
use crate::reports::{self, BackendReports, MemoryReports, ReportRecord, ReportStore};

/// Remote services the desk talks to.
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub directory: Arc<dyn UserDirectory>,
    pub reports: Arc<dyn ReportStore>,
}

impl Collaborators {
    pub fn http(client: Arc<BackendClient>, report_table: &str) -> Self {
        Self {
            identity: client.clone(),
            directory: client.clone(),
            reports: Arc::new(BackendReports::new(client, report_table)),
        }
    }

    pub fn memory(
        identity: Arc<MemoryIdentityProvider>,
        directory: Arc<MemoryDirectory>,
        reports: Arc<MemoryReports>,
    ) -> Self {
        Self {
            identity,
            directory,
            reports,
        }
    }
}

/// The protected reports view, only ever built for a signed-in user.
pub struct ReportView {
    pub user: User,
    pub form: Form<BugReport>,
}

pub struct Desk {
    session: SessionStore,
    guard: RouteGuard,
    navigator: Arc<HistoryNavigator>,
    reports: Arc<dyn ReportStore>,
    notifier: Notifier,
    routes: RouteSettings,
}

impl Desk {
    pub fn new(collaborators: Collaborators, routes: RouteSettings, notifier: Notifier) -> Self {
        let session = SessionStore::new(collaborators.identity, collaborators.directory);
        let navigator = Arc::new(HistoryNavigator::new(routes.home.clone()));
        let guard = RouteGuard::new(session.query(), navigator.clone(), routes.login.clone());
        Self {
            session,
            guard,
            navigator,
            reports: collaborators.reports,
            notifier,
            routes,
        }
    }

    /// Begin listening for identity provider events.
    pub fn start(&self) -> bool {
        self.session.start()
    }

    pub fn shutdown(&self) {
        self.session.shutdown();
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn navigator(&self) -> &HistoryNavigator {
        &self.navigator
    }

    pub fn routes(&self) -> &RouteSettings {
        &self.routes
    }

    pub fn login_form(&self) -> Form<LoginForm> {
        Form::new(self.notifier.clone())
    }

    pub fn signup_form(&self) -> Form<SignupForm> {
        Form::new(self.notifier.clone())
    }

    pub async fn submit_login(&self, form: &Form<LoginForm>) -> SubmitOutcome {
        self.submit_auth(AuthMode::Login, form).await
    }

    pub async fn submit_signup(&self, form: &Form<SignupForm>) -> SubmitOutcome {
        let session = &self.session;
        let outcome = form
            .submit(|creds: SignupForm| async move {
                auth::sign_up(session, &creds.email, &creds.password).await
            })
            .await;
        self.after_auth(&outcome);
        outcome
    }

    /// Submit the combined credentials form in either mode.
    pub async fn submit_auth(&self, mode: AuthMode, form: &Form<LoginForm>) -> SubmitOutcome {
        let session = &self.session;
        let outcome = match mode {
            AuthMode::Login => {
                form.submit(|creds: LoginForm| async move {
                    auth::sign_in(session, &creds.email, &creds.password).await
                })
                .await
            }
            AuthMode::SignUp => {
                form.submit(|creds: LoginForm| async move {
                    auth::sign_up(session, &creds.email, &creds.password).await
                })
                .await
            }
        };
        self.after_auth(&outcome);
        outcome
    }

    fn after_auth(&self, outcome: &SubmitOutcome) {
        if outcome.is_success() {
            self.navigator.navigate_to(&self.routes.reports);
        }
    }

    /// Navigate to the reports route and run the guard.
    ///
    /// Cancel `unmounted` to abandon the view before the guard decides.
    pub async fn open_reports(&self, unmounted: &CancellationToken) -> GuardOutcome<ReportView> {
        self.navigator.navigate_to(&self.routes.reports);
        let notifier = self.notifier.clone();
        let outcome = self
            .guard
            .enter(unmounted, |user| {
                debug!(user_id = %user.id, "reports view initialised");
                ReportView {
                    user,
                    form: Form::new(notifier),
                }
            })
            .await;
        if let GuardOutcome::Redirected(redirect) = &outcome {
            info!(to = %redirect.to, "reports view denied");
        }
        outcome
    }

    pub async fn submit_report(&self, view: &ReportView) -> SubmitOutcome {
        let store = &self.reports;
        let user_id = view.user.id;
        view.form
            .submit(|report: BugReport| async move {
                store.insert(&ReportRecord::new(&report, user_id)).await?;
                Ok::<_, reports::ReportError>(reports::submitted_toast(&report))
            })
            .await
    }

    /// Sign out and return to the login route.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.session.sign_out().await;
        self.navigator.navigate_to(&self.routes.login);
        result
    }
}

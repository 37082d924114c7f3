//! End-to-end flows of the desk against the in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use forms::{Submission, SubmitFailure, SubmitOutcome};
use notify::{NotificationCenter, NotificationKind};
use report_desk::auth::{AuthMode, LOGIN_SUCCESS, SIGNUP_SUCCESS};
use report_desk::config::RouteSettings;
use report_desk::models::{BugType, PASSWORD_TOO_SHORT};
use report_desk::reports::{MemoryReports, REPORT_SUBMITTED};
use report_desk::{Collaborators, Desk};
use session::memory::{MemoryDirectory, MemoryIdentityProvider};
use session::{DenyReason, GuardOutcome, Session};
use tokio_util::sync::CancellationToken;

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "correct-horse";

struct Harness {
    desk: Desk,
    center: NotificationCenter,
    provider: Arc<MemoryIdentityProvider>,
    directory: Arc<MemoryDirectory>,
    reports: Arc<MemoryReports>,
}

fn harness(provider: MemoryIdentityProvider) -> Harness {
    let provider = Arc::new(provider);
    let directory = Arc::new(MemoryDirectory::new());
    let reports = Arc::new(MemoryReports::new());
    let (notifier, center) = notify::channel(Duration::from_secs(60));
    let desk = Desk::new(
        Collaborators::memory(provider.clone(), directory.clone(), reports.clone()),
        RouteSettings::default(),
        notifier,
    );
    desk.start();
    Harness {
        desk,
        center,
        provider,
        directory,
        reports,
    }
}

impl Harness {
    fn latest(&mut self) -> (NotificationKind, String, Option<String>) {
        self.center.pump();
        let n = self.center.latest().expect("a notification");
        (n.kind, n.message.clone(), n.description.clone())
    }

    async fn log_in(&self) -> SubmitOutcome {
        let form = self.desk.login_form();
        form.set_field_value("email", EMAIL).unwrap();
        form.set_field_value("password", PASSWORD).unwrap();
        self.desk.submit_login(&form).await
    }
}

#[tokio::test]
async fn login_opens_the_reports_view() {
    let mut h = harness(MemoryIdentityProvider::new().with_account(EMAIL, PASSWORD));

    assert_eq!(h.log_in().await, SubmitOutcome::Succeeded);
    assert!(h.desk.session().get_session().is_authenticated());
    assert_eq!(h.desk.navigator().current(), "/reports");
    assert_eq!(
        h.latest(),
        (NotificationKind::Success, LOGIN_SUCCESS.to_string(), None)
    );

    let outcome = h.desk.open_reports(&CancellationToken::new()).await;
    let GuardOutcome::Rendered(view) = outcome else {
        panic!("guard should let a signed-in user through");
    };
    assert_eq!(view.user.email, EMAIL);
    assert_eq!(h.desk.navigator().current(), "/reports");
}

#[tokio::test]
async fn short_password_never_reaches_the_provider() {
    let h = harness(MemoryIdentityProvider::new().with_account(EMAIL, PASSWORD));
    let form = h.desk.login_form();
    form.set_field_value("email", EMAIL).unwrap();
    form.set_field_value("password", "abc").unwrap();

    let SubmitOutcome::Invalid(errors) = h.desk.submit_login(&form).await else {
        panic!("expected a validation failure");
    };
    assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["password"]);
    assert_eq!(errors.first("password"), Some(PASSWORD_TOO_SHORT));
    assert_eq!(h.provider.sign_in_calls(), 0);
    assert_eq!(
        form.submission(),
        Submission::Failed(SubmitFailure::Validation)
    );
    assert!(!h.desk.session().get_session().is_authenticated());
    assert_eq!(h.desk.navigator().current(), "/");
}

#[tokio::test]
async fn wrong_password_shows_provider_message() {
    let mut h = harness(MemoryIdentityProvider::new().with_account(EMAIL, PASSWORD));
    let form = h.desk.login_form();
    form.set_field_value("email", EMAIL).unwrap();
    form.set_field_value("password", "not-the-one").unwrap();

    let outcome = h.desk.submit_login(&form).await;
    assert_eq!(
        outcome,
        SubmitOutcome::Rejected("Invalid login credentials".into())
    );
    let (kind, message, _) = h.latest();
    assert_eq!(kind, NotificationKind::Error);
    assert_eq!(message, "Invalid login credentials");
    assert!(!h.desk.session().get_session().is_authenticated());
}

#[tokio::test]
async fn signup_with_failing_directory_keeps_the_session() {
    let mut h = harness(MemoryIdentityProvider::new());
    h.directory
        .fail_with(Some("new row violates row-level security policy"));

    let form = h.desk.signup_form();
    form.set_field_value("email", EMAIL).unwrap();
    form.set_field_value("password", PASSWORD).unwrap();
    form.set_field_value("confirmPassword", PASSWORD).unwrap();

    let outcome = h.desk.submit_signup(&form).await;
    assert!(matches!(outcome, SubmitOutcome::Rejected(_)));
    assert!(h.desk.session().get_session().is_authenticated());
    assert_eq!(h.directory.insert_calls(), 1);

    let (kind, message, _) = h.latest();
    assert_eq!(kind, NotificationKind::Error);
    assert_eq!(message, "new row violates row-level security policy");
}

#[tokio::test]
async fn signup_writes_profile_row() {
    let mut h = harness(MemoryIdentityProvider::new());
    let form = h.desk.signup_form();
    form.set_field_value("email", EMAIL).unwrap();
    form.set_field_value("password", PASSWORD).unwrap();
    form.set_field_value("confirmPassword", PASSWORD).unwrap();

    assert_eq!(h.desk.submit_signup(&form).await, SubmitOutcome::Succeeded);
    let rows = h.directory.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].email, EMAIL);
    assert_eq!(Some(rows[0].id), h.provider.account_id(EMAIL));
    assert_eq!(h.latest().1, SIGNUP_SUCCESS);
    assert_eq!(h.desk.navigator().current(), "/reports");
}

#[tokio::test]
async fn combined_form_signs_up_in_signup_mode() {
    let h = harness(MemoryIdentityProvider::new());
    let mode = AuthMode::Login.toggle();
    assert_eq!(mode, AuthMode::SignUp);
    assert_eq!(mode.route(h.desk.routes()), "/auth/signup");

    let form = h.desk.login_form();
    form.set_field_value("email", EMAIL).unwrap();
    form.set_field_value("password", PASSWORD).unwrap();
    assert_eq!(
        h.desk.submit_auth(mode, &form).await,
        SubmitOutcome::Succeeded
    );
    assert_eq!(h.provider.sign_up_calls(), 1);
    assert_eq!(h.provider.sign_in_calls(), 0);
    assert_eq!(h.directory.rows().len(), 1);
}

#[tokio::test]
async fn report_submission_stores_row_for_user() {
    let mut h = harness(MemoryIdentityProvider::new().with_account(EMAIL, PASSWORD));
    h.log_in().await;
    let GuardOutcome::Rendered(view) = h.desk.open_reports(&CancellationToken::new()).await
    else {
        panic!("expected the reports view");
    };

    view.form.set_field_value("title", "Login button dead").unwrap();
    view.form
        .set_field_value("description", "Tapping the login button on mobile does nothing.")
        .unwrap();
    view.form.set_field_value("bugType", "UI/UX").unwrap();

    assert_eq!(h.desk.submit_report(&view).await, SubmitOutcome::Succeeded);
    let rows = h.reports.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bug_type, BugType::UiUx);
    assert!(rows[0].can_reproduce);
    assert_eq!(Some(rows[0].user_id), h.provider.account_id(EMAIL));

    let (kind, message, description) = h.latest();
    assert_eq!(kind, NotificationKind::Info);
    assert_eq!(message, REPORT_SUBMITTED);
    let json: serde_json::Value = serde_json::from_str(&description.unwrap()).unwrap();
    assert_eq!(json["title"], "Login button dead");
    assert_eq!(json["bugType"], "UI/UX");
    assert_eq!(json["canReproduce"], true);
}

#[tokio::test]
async fn failed_report_insert_keeps_values() {
    let mut h = harness(MemoryIdentityProvider::new().with_account(EMAIL, PASSWORD));
    h.log_in().await;
    let GuardOutcome::Rendered(view) = h.desk.open_reports(&CancellationToken::new()).await
    else {
        panic!("expected the reports view");
    };
    h.reports.fail_with(Some("permission denied for table reports"));

    view.form.set_field_value("title", "Slow dashboard").unwrap();
    view.form
        .set_field_value("description", "The dashboard takes a minute to load.")
        .unwrap();
    view.form.set_field_value("bugType", "Performance").unwrap();

    let outcome = h.desk.submit_report(&view).await;
    assert!(matches!(outcome, SubmitOutcome::Rejected(_)));
    assert!(h.reports.rows().is_empty());
    assert_eq!(h.latest().1, "permission denied for table reports");
    assert_eq!(view.form.values().text("title"), "Slow dashboard");
}

#[tokio::test]
async fn anonymous_visitor_is_sent_to_login() {
    let h = harness(MemoryIdentityProvider::new());
    let outcome = h.desk.open_reports(&CancellationToken::new()).await;
    let GuardOutcome::Redirected(redirect) = outcome else {
        panic!("anonymous visitor must not see the reports view");
    };
    assert_eq!(redirect.to, "/auth/login");
    assert_eq!(redirect.reason, DenyReason::Anonymous);
    assert_eq!(h.desk.navigator().current(), "/auth/login");
}

#[tokio::test]
async fn offline_provider_fails_closed() {
    let h = harness(MemoryIdentityProvider::new().with_account(EMAIL, PASSWORD));
    h.provider.set_offline(true);
    let outcome = h.desk.open_reports(&CancellationToken::new()).await;
    assert!(matches!(
        outcome,
        GuardOutcome::Redirected(redirect) if matches!(redirect.reason, DenyReason::ResolutionFailed(_))
    ));
}

#[tokio::test]
async fn sign_out_closes_the_reports_view() {
    let h = harness(MemoryIdentityProvider::new().with_account(EMAIL, PASSWORD));
    h.log_in().await;
    assert!(
        h.desk
            .open_reports(&CancellationToken::new())
            .await
            .is_rendered()
    );

    h.desk.sign_out().await.unwrap();
    assert_eq!(h.desk.session().get_session(), Session::Anonymous);
    assert_eq!(h.desk.navigator().current(), "/auth/login");

    let outcome = h.desk.open_reports(&CancellationToken::new()).await;
    assert!(matches!(outcome, GuardOutcome::Redirected(_)));
}

#[tokio::test]
async fn unmounted_view_is_discarded() {
    let h = harness(MemoryIdentityProvider::new().with_account(EMAIL, PASSWORD));
    h.log_in().await;
    let unmounted = CancellationToken::new();
    unmounted.cancel();
    assert!(matches!(
        h.desk.open_reports(&unmounted).await,
        GuardOutcome::Discarded
    ));
}

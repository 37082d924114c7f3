use std::path::PathBuf;
use std::sync::Arc;

use app::AppContext;
use backend::{BackendClient, BackendSettings};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{bail, Result};
use forms::{Form, FormModel, SubmitOutcome};
use notify::{Notification, NotificationCenter};
use session::memory::{MemoryDirectory, MemoryIdentityProvider};
use session::GuardOutcome;
use settings::SettingsStore;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::auth::AuthMode;
use crate::config::DeskConfig;
use crate::desk::{Collaborators, Desk};
use crate::reports::MemoryReports;

#[derive(Parser, Debug)]
#[command(name = "report-desk", version, about = "File bug reports behind a signed-in session")]
pub struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use an in-process backend; credentials given on the command line are accepted
    #[arg(long, global = true)]
    pub offline: bool,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Args, Debug, Clone)]
pub struct Credentials {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Sign in with email and password
    Login(Credentials),
    /// Create an account
    Signup {
        #[command(flatten)]
        credentials: Credentials,
        /// Password confirmation (defaults to the password)
        #[arg(long)]
        confirm: Option<String>,
    },
    /// File a bug report (requires a session)
    Report(ReportArgs),
    /// Show the signed-in user
    Whoami,
    /// End the session
    Logout,
    /// Inspect or change settings
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    /// One of: UI/UX, Functionality, Performance, Security
    #[arg(long = "type")]
    pub bug_type: String,
    /// The bug cannot be reproduced consistently
    #[arg(long)]
    pub not_reproducible: bool,
    /// Sign in before filing
    #[arg(long, requires = "password")]
    pub email: Option<String>,
    #[arg(long, requires = "email")]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    /// Print the effective settings
    Show,
    /// Point the desk at another backend
    SetUrl { url: String },
}

impl Cmd {
    fn credentials(&self) -> Option<(&str, &str)> {
        match self {
            Cmd::Login(c) | Cmd::Signup { credentials: c, .. } => {
                Some((c.email.as_str(), c.password.as_str()))
            }
            Cmd::Report(ReportArgs {
                email: Some(email),
                password: Some(password),
                ..
            }) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

pub async fn run(cli: Cli, ctx: &AppContext) -> Result<()> {
    let store = ctx.open_settings(cli.config.clone())?;
    DeskConfig::register(&store)?;

    if let Cmd::Config { action } = &cli.cmd {
        return config_command(&store, action);
    }

    let config = DeskConfig::load(&store)?;
    let (notifier, mut center) = notify::channel(config.notifications.ttl());
    let collaborators = if cli.offline {
        let mut provider = MemoryIdentityProvider::new();
        // seed the account so offline login succeeds; signup registers it itself
        if let (Some((email, password)), false) =
            (cli.cmd.credentials(), matches!(cli.cmd, Cmd::Signup { .. }))
        {
            provider = provider.with_account(email, password);
        }
        Collaborators::memory(
            Arc::new(provider),
            Arc::new(MemoryDirectory::new()),
            Arc::new(MemoryReports::new()),
        )
    } else {
        let client = BackendClient::new(&config.backend)?
            .with_token_file(ctx.path_context().data_dir().join("session.json"))?;
        Collaborators::http(Arc::new(client), &config.backend.report_table)
    };

    let desk = Desk::new(collaborators, config.routes.clone(), notifier);
    desk.start();
    if let Err(err) = desk.session().resolve().await {
        warn!(error = %err, "could not resolve stored session");
    }

    let ok = execute(&desk, cli.cmd).await;
    desk.shutdown();

    print_notifications(&mut center);
    if !ok {
        bail!("command failed");
    }
    Ok(())
}

async fn execute(desk: &Desk, cmd: Cmd) -> bool {
    match cmd {
        Cmd::Login(c) => {
            let form = desk.login_form();
            fill(&form, &[("email", &c.email), ("password", &c.password)]);
            let outcome = desk.submit_login(&form).await;
            print_switch_hint(AuthMode::Login, &outcome);
            report_outcome(&form, &outcome)
        }
        Cmd::Signup {
            credentials: c,
            confirm,
        } => {
            let form = desk.signup_form();
            let confirm = confirm.unwrap_or_else(|| c.password.clone());
            fill(
                &form,
                &[
                    ("email", &c.email),
                    ("password", &c.password),
                    ("confirmPassword", &confirm),
                ],
            );
            let outcome = desk.submit_signup(&form).await;
            print_switch_hint(AuthMode::SignUp, &outcome);
            report_outcome(&form, &outcome)
        }
        Cmd::Report(args) => file_report(desk, args).await,
        Cmd::Whoami => match desk.session().query().get().await {
            Ok(session) => {
                match session.user() {
                    Some(user) => println!("{} ({})", user.email, user.id),
                    None => println!("not signed in"),
                }
                true
            }
            Err(err) => {
                eprintln!("{err}");
                false
            }
        },
        Cmd::Logout => match desk.sign_out().await {
            Ok(()) => {
                println!("signed out");
                true
            }
            Err(err) => {
                eprintln!("signed out locally; {err}");
                false
            }
        },
        Cmd::Config { .. } => true,
    }
}

async fn file_report(desk: &Desk, args: ReportArgs) -> bool {
    if let (Some(email), Some(password)) = (&args.email, &args.password) {
        let form = desk.login_form();
        fill(&form, &[("email", email), ("password", password)]);
        let outcome = desk.submit_login(&form).await;
        if !report_outcome(&form, &outcome) {
            return false;
        }
    }

    let unmounted = CancellationToken::new();
    let view = match desk.open_reports(&unmounted).await {
        GuardOutcome::Rendered(view) => view,
        GuardOutcome::Redirected(redirect) => {
            eprintln!("not signed in; go to {}", redirect.to);
            return false;
        }
        GuardOutcome::Discarded => return false,
    };

    fill(
        &view.form,
        &[
            ("title", &args.title),
            ("description", &args.description),
            ("bugType", &args.bug_type),
        ],
    );
    if let Err(err) = view
        .form
        .set_field_value("canReproduce", !args.not_reproducible)
    {
        eprintln!("{err}");
        return false;
    }
    let outcome = desk.submit_report(&view).await;
    report_outcome(&view.form, &outcome)
}

/// Link to the other credentials mode, shown when the provider rejected the attempt.
fn switch_hint(mode: AuthMode, outcome: &SubmitOutcome) -> Option<String> {
    let SubmitOutcome::Rejected(_) = outcome else {
        return None;
    };
    let command = match mode.toggle() {
        AuthMode::Login => "login",
        AuthMode::SignUp => "signup",
    };
    Some(format!("{} (report-desk {command})", mode.switch_prompt()))
}

fn print_switch_hint(mode: AuthMode, outcome: &SubmitOutcome) {
    if let Some(hint) = switch_hint(mode, outcome) {
        eprintln!("{hint}");
    }
}

fn fill<M: FormModel>(form: &Form<M>, values: &[(&str, &String)]) {
    for (name, value) in values {
        if let Err(err) = form.set_field_value(name, value.as_str()) {
            warn!(field = %name, error = %err, "could not set field");
        }
    }
}

/// Print field errors of an invalid submission. Returns whether it succeeded.
fn report_outcome<M: FormModel>(form: &Form<M>, outcome: &SubmitOutcome) -> bool {
    match outcome {
        SubmitOutcome::Succeeded => true,
        SubmitOutcome::Invalid(_) => {
            eprintln!("{}:", form.schema().title);
            for field in form.schema().fields() {
                let Ok(binding) = form.bind(&field.key) else { continue };
                if binding.is_invalid() {
                    for error in binding.errors() {
                        eprintln!("  {}: {}", field.label, error);
                    }
                }
            }
            false
        }
        SubmitOutcome::Rejected(_) | SubmitOutcome::Busy | SubmitOutcome::Discarded => false,
    }
}

/// Move every pending notification out of the center, oldest first.
fn take_notifications(center: &mut NotificationCenter) -> Vec<Notification> {
    center.pump();
    let mut keys: Vec<_> = center.active().iter().map(|n| n.id).collect();
    keys.reverse();
    keys.into_iter()
        .filter_map(|key| center.dismiss(key))
        .collect()
}

fn print_notifications(center: &mut NotificationCenter) {
    for notification in take_notifications(center) {
        println!("[{}] {}", notification.kind.label(), notification.message);
        if let Some(description) = &notification.description {
            for line in description.lines() {
                println!("    {line}");
            }
        }
    }
}

fn config_command(store: &SettingsStore, action: &ConfigCmd) -> Result<()> {
    match action {
        ConfigCmd::Show => {
            println!("# {}", store.file_path().display());
            println!("{}", store.render()?);
        }
        ConfigCmd::SetUrl { url } => {
            // reject anything the client could not use
            BackendClient::new(&BackendSettings {
                url: url.clone(),
                ..BackendSettings::default()
            })?;
            let updated = store.update::<BackendSettings, _>(|backend| backend.url = url.clone())?;
            println!("backend url set to {}", updated.url);
        }
    }
    Ok(())
}

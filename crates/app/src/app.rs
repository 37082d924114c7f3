mod paths;

pub use paths::{PathContext, RuntimeEnvironment};

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::OnceLock;

use settings::{SettingsError, SettingsStore};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

static LOGGING: OnceLock<()> = OnceLock::new();

/// Application infrastructure context.
///
/// Paths, version info and the log writer guard.
pub struct AppContext {
    pub path_context: PathContext,
    pub version: &'static str,
    /// Keeps the non-blocking file writer alive so buffered lines are
    /// flushed on exit. `None` when logging was already set up.
    _log_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl AppContext {
    pub fn app_id(&self) -> &str {
        self.path_context.app_id()
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn path_context(&self) -> &PathContext {
        &self.path_context
    }

    /// Open the settings store at `path`, or at the default settings file.
    pub fn open_settings(&self, path: Option<PathBuf>) -> Result<SettingsStore, SettingsError> {
        let path = path.unwrap_or_else(|| self.path_context.settings_file());
        SettingsStore::builder().with_settings_file(path).build()
    }
}

/// Application metadata.
///
/// Define the application's identity by implementing this trait.
pub trait Application: Sized + 'static {
    const APP_ID: &'static str;
    const QUALIFIER: &'static str = "dev";
    const ORGANIZATION: &'static str = "report-desk";
}

/// Builder for [`AppContext`].
///
/// ```ignore
/// struct Desk;
/// impl Application for Desk { const APP_ID: &'static str = "report_desk"; }
///
/// let ctx = AppBuilder::<Desk>::new(env!("CARGO_PKG_VERSION")).build()?;
/// ```
pub struct AppBuilder<A: Application> {
    version: &'static str,
    base_path: Option<PathBuf>,
    console: bool,
    _marker: PhantomData<A>,
}

impl<A: Application> AppBuilder<A> {
    pub fn new(version: &'static str) -> Self {
        Self {
            version,
            base_path: None,
            console: true,
            _marker: PhantomData,
        }
    }

    /// Put all directories below `path` instead of the platform locations.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Mirror log lines to stderr (default on).
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Create directories and install logging.
    ///
    /// Logging is installed once per process; later builds reuse it.
    pub fn build(self) -> Result<AppContext, BoxError> {
        let path_context = match self.base_path {
            Some(base) => PathContext::with_base_path(base, A::APP_ID),
            None => PathContext::new(A::QUALIFIER, A::ORGANIZATION, A::APP_ID),
        };
        path_context.ensure_directories()?;

        let log_guard = init_logging(&path_context, self.console)?;

        tracing::info!(
            app = A::APP_ID,
            version = self.version,
            environment = ?path_context.environment(),
            "application initialised"
        );

        Ok(AppContext {
            path_context,
            version: self.version,
            _log_guard: log_guard,
        })
    }
}

fn init_logging(
    paths: &PathContext,
    console: bool,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, BoxError> {
    if LOGGING.get().is_some() {
        return Ok(None);
    }

    let log_file = paths.log_file_now();
    let (Some(log_dir), Some(log_name)) = (log_file.parent(), log_file.file_name()) else {
        return Err(format!("invalid log file path {}", log_file.display()).into());
    };
    let appender = tracing_appender::rolling::never(log_dir, log_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    #[cfg(debug_assertions)]
    let level = LevelFilter::INFO;

    #[cfg(not(debug_assertions))]
    let level = LevelFilter::WARN;

    // RUST_LOG overrides the build-dependent default
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy()
    };

    let file_layer = fmt::Layer::default()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(filter());

    let console_layer = console.then(|| {
        fmt::Layer::default()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter())
    });

    let installed = tracing_subscriber::registry()
        .with(tracing_error::ErrorLayer::default())
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // another subscriber may have been installed by a host process or test
    let _ = LOGGING.set(());
    match installed {
        Ok(()) => Ok(Some(guard)),
        Err(_) => Ok(None),
    }
}

//! Per-application directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;

/// Where the application is running from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// `cargo run` or a binary inside a `target/` directory
    Development,
    /// Installed binary
    Production,
}

/// Paths for config, data and logs of one application.
///
/// In production these come from the platform directories; in development
/// (and in tests) everything lives below an explicit base path.
#[derive(Debug, Clone)]
pub struct PathContext {
    environment: RuntimeEnvironment,
    config_dir: Arc<Path>,
    data_dir: Arc<Path>,
    app_id: &'static str,
}

impl PathContext {
    /// Platform directories for `qualifier.organization.app_id`.
    ///
    /// Falls back to `./.out/<app_id>` when no home directory can be found.
    pub fn new(qualifier: &str, organization: &str, app_id: &'static str) -> Self {
        let environment = Self::detect_environment();
        match ProjectDirs::from(qualifier, organization, app_id) {
            Some(dirs) => Self {
                environment,
                config_dir: dirs.config_local_dir().into(),
                data_dir: dirs.data_local_dir().into(),
                app_id,
            },
            None => Self::with_base_path(PathBuf::from(".out"), app_id),
        }
    }

    /// Everything below `base/<app_id>/`.
    pub fn with_base_path(base: impl Into<PathBuf>, app_id: &'static str) -> Self {
        let root = base.into().join(app_id);
        Self {
            environment: Self::detect_environment(),
            config_dir: root.join("config").into(),
            data_dir: root.join("data").into(),
            app_id,
        }
    }

    fn detect_environment() -> RuntimeEnvironment {
        let in_target = std::env::current_exe()
            .map(|exe| exe.components().any(|c| c.as_os_str() == "target"))
            .unwrap_or(false);
        if in_target || std::env::var_os("CARGO").is_some() {
            RuntimeEnvironment::Development
        } else {
            RuntimeEnvironment::Production
        }
    }

    pub fn app_id(&self) -> &'static str {
        self.app_id
    }

    pub fn environment(&self) -> RuntimeEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// `<config_dir>/<app_id>.ron`
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(format!("{}.ron", self.app_id))
    }

    /// `<logs_dir>/<app_id>.<timestamp>.log`
    pub fn log_file(&self, timestamp: &str) -> PathBuf {
        self.logs_dir()
            .join(format!("{}.{}.log", self.app_id, timestamp))
    }

    pub fn log_file_now(&self) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        self.log_file(&timestamp)
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [self.config_dir.to_path_buf(), self.data_dir.to_path_buf(), self.logs_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_layout() {
        let ctx = PathContext::with_base_path("/test/base", "report_desk");
        assert_eq!(ctx.app_id(), "report_desk");
        assert_eq!(ctx.config_dir(), Path::new("/test/base/report_desk/config"));
        assert_eq!(
            ctx.settings_file(),
            PathBuf::from("/test/base/report_desk/config/report_desk.ron")
        );
        assert_eq!(
            ctx.log_file("20240101-120000"),
            PathBuf::from("/test/base/report_desk/data/logs/report_desk.20240101-120000.log")
        );
    }

    #[test]
    fn ensure_directories_creates_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = PathContext::with_base_path(tmp.path(), "report_desk");
        ctx.ensure_directories().unwrap();
        assert!(ctx.config_dir().is_dir());
        assert!(ctx.logs_dir().is_dir());
    }
}

//! Settings sections of the desk.

use std::time::Duration;

use backend::BackendSettings;
use serde::{Deserialize, Serialize};
use settings::{Settings, SettingsError, SettingsStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    pub login: String,
    pub signup: String,
    pub reports: String,
    pub home: String,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            login: "/auth/login".into(),
            signup: "/auth/signup".into(),
            reports: "/reports".into(),
            home: "/".into(),
        }
    }
}

impl Settings for RouteSettings {
    const SECTION: &'static str = "routes";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// How long a toast stays visible.
    pub ttl_ms: u64,
}

impl NotificationSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            ttl_ms: notify::DEFAULT_TTL.as_millis() as u64,
        }
    }
}

impl Settings for NotificationSettings {
    const SECTION: &'static str = "notifications";
}

/// All sections, read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeskConfig {
    pub backend: BackendSettings,
    pub routes: RouteSettings,
    pub notifications: NotificationSettings,
}

impl DeskConfig {
    pub fn register(store: &SettingsStore) -> Result<(), SettingsError> {
        store.register::<BackendSettings>()?;
        store.register::<RouteSettings>()?;
        store.register::<NotificationSettings>()?;
        Ok(())
    }

    pub fn load(store: &SettingsStore) -> Result<Self, SettingsError> {
        Ok(Self {
            backend: store.get()?,
            routes: store.get()?,
            notifications: store.get()?,
        })
    }
}

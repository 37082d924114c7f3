use serde::{Deserialize, Serialize};
use settings::Settings;

/// `backend` section of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    /// Table that receives one profile row per signed-up user.
    pub user_table: String,
    /// Table that receives bug reports.
    pub report_table: String,
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".into(),
            anon_key: String::new(),
            user_table: "user".into(),
            report_table: "reports".into(),
            timeout_secs: 10,
        }
    }
}

impl Settings for BackendSettings {
    const SECTION: &'static str = "backend";
}

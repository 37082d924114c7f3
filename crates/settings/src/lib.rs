//! Sectioned settings backed by a single RON file.
//!
//! Each settings type owns one top-level section. The file only stores the
//! fields that differ from the type's `Default`; everything else is filled in
//! from defaults at registration time.

mod delta;
mod errors;
mod store;

pub use errors::SettingsError;
pub use store::{SettingsStore, SettingsStoreBuilder};

use serde::{de::DeserializeOwned, Serialize};

/// A typed section of the settings file.
pub trait Settings: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Top-level key of the section in the file.
    const SECTION: &'static str;

    fn name() -> &'static str {
        Self::SECTION
    }
}

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use ron::value::{Map as RonMap, Value as RonValue};
use serde::Deserialize;
use tracing::{debug, info};

use crate::delta::{diff, merge, to_map};
use crate::{Settings, SettingsError};

/// Builder for [`SettingsStore`].
#[derive(Debug, Default)]
pub struct SettingsStoreBuilder {
    settings_file: Option<PathBuf>,
}

impl SettingsStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    /// Read the delta file (a missing or empty file means "all defaults").
    pub fn build(self) -> Result<SettingsStore, SettingsError> {
        let file_path = self
            .settings_file
            .ok_or(SettingsError::Invalid("settings file not specified"))?;
        let deltas = read_deltas(&file_path)?;
        debug!(path = %file_path.display(), sections = deltas.len(), "settings loaded");
        Ok(SettingsStore {
            file_path,
            deltas: RwLock::new(deltas),
            defaults: RwLock::new(HashMap::new()),
            values: RwLock::new(HashMap::new()),
        })
    }
}

/// Thread-safe view over the settings file.
///
/// Sections that exist in the file but were never registered are kept as-is
/// when the file is rewritten.
#[derive(Debug)]
pub struct SettingsStore {
    file_path: PathBuf,
    deltas: RwLock<BTreeMap<String, RonValue>>,
    defaults: RwLock<HashMap<&'static str, RonMap>>,
    values: RwLock<HashMap<&'static str, RonValue>>,
}

impl SettingsStore {
    pub fn builder() -> SettingsStoreBuilder {
        SettingsStoreBuilder::new()
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn is_registered<T: Settings>(&self) -> bool {
        self.values.read().contains_key(T::name())
    }

    /// Register a section: its defaults overlaid with whatever the file holds.
    pub fn register<T: Settings>(&self) -> Result<(), SettingsError> {
        let section = T::name();
        if self.is_registered::<T>() {
            return Err(SettingsError::AlreadyRegistered(section));
        }

        let defaults = to_map(&T::default())?;
        let merged = match self.deltas.read().get(section) {
            Some(RonValue::Map(delta)) => merge(&defaults, delta),
            Some(_) => return Err(SettingsError::Invalid("section must be a map")),
            None => defaults.clone(),
        };

        self.defaults.write().insert(section, defaults);
        self.values.write().insert(section, RonValue::Map(merged));
        debug!(section, "settings section registered");
        Ok(())
    }

    /// Current value of a section.
    pub fn get<T: Settings>(&self) -> Result<T, SettingsError> {
        let section = T::name();
        let values = self.values.read();
        let value = values
            .get(section)
            .ok_or(SettingsError::NotRegistered(section))?;
        Ok(T::deserialize(value.clone())?)
    }

    /// Mutate a section and persist the difference to its defaults.
    pub fn update<T, F>(&self, mutator: F) -> Result<T, SettingsError>
    where
        T: Settings,
        F: FnOnce(&mut T),
    {
        let section = T::name();
        let mut current = self.get::<T>()?;
        mutator(&mut current);

        let updated = to_map(&current)?;
        let changes = {
            let defaults = self.defaults.read();
            let defaults = defaults
                .get(section)
                .ok_or(SettingsError::NotRegistered(section))?;
            diff(&updated, defaults)
        };

        self.values.write().insert(section, RonValue::Map(updated));
        {
            let mut deltas = self.deltas.write();
            if changes.is_empty() {
                deltas.remove(section);
            } else {
                deltas.insert(section.to_owned(), RonValue::Map(changes));
            }
        }

        self.persist()?;
        info!(section, path = %self.file_path.display(), "settings updated");
        Ok(current)
    }

    /// Re-read the file and re-merge every registered section.
    pub fn reload(&self) -> Result<(), SettingsError> {
        let fresh = read_deltas(&self.file_path)?;
        let defaults = self.defaults.read();
        let mut values = self.values.write();
        for (section, default) in defaults.iter() {
            let merged = match fresh.get(*section) {
                Some(RonValue::Map(delta)) => merge(default, delta),
                Some(_) => return Err(SettingsError::Invalid("section must be a map")),
                None => default.clone(),
            };
            values.insert(*section, RonValue::Map(merged));
        }
        *self.deltas.write() = fresh;
        Ok(())
    }

    /// Effective value of every registered section as pretty RON.
    pub fn render(&self) -> Result<String, SettingsError> {
        let values = self.values.read();
        let sorted: BTreeMap<&str, &RonValue> = values.iter().map(|(k, v)| (*k, v)).collect();
        Ok(ron::ser::to_string_pretty(
            &sorted,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    fn persist(&self) -> Result<(), SettingsError> {
        if let Some(dir) = self.file_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let text = {
            let deltas = self.deltas.read();
            ron::ser::to_string_pretty(&*deltas, ron::ser::PrettyConfig::default())?
        };
        let tmp = self.file_path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.file_path)?;
        Ok(())
    }
}

fn read_deltas(path: &Path) -> Result<BTreeMap<String, RonValue>, SettingsError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(ron::from_str(&content)?)
}

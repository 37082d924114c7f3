//! Recursive merge and diff of RON maps.

use ron::value::{Map as RonMap, Value as RonValue};
use serde::Serialize;

use crate::SettingsError;

/// Serialize a section into a RON map.
pub(crate) fn to_map<T: Serialize>(value: &T) -> Result<RonMap, SettingsError> {
    let text = ron::to_string(value)?;
    match ron::from_str::<RonValue>(&text)? {
        RonValue::Map(map) => Ok(map),
        _ => Err(SettingsError::Invalid("section must serialize to a map")),
    }
}

/// Overlay `delta` onto `base`. Nested maps merge, everything else replaces.
pub(crate) fn merge(base: &RonMap, delta: &RonMap) -> RonMap {
    let mut merged = base.clone();
    for (key, over) in delta.iter() {
        let value = match (merged.get(key), over) {
            (Some(RonValue::Map(inner)), RonValue::Map(over_inner)) => {
                RonValue::Map(merge(inner, over_inner))
            }
            _ => over.clone(),
        };
        merged.insert(key.clone(), value);
    }
    merged
}

/// Entries of `current` that differ from `defaults`. Empty if identical.
pub(crate) fn diff(current: &RonMap, defaults: &RonMap) -> RonMap {
    let mut out = RonMap::new();
    for (key, value) in current.iter() {
        match (defaults.get(key), value) {
            (Some(RonValue::Map(def)), RonValue::Map(cur)) => {
                let nested = diff(cur, def);
                if !nested.is_empty() {
                    out.insert(key.clone(), RonValue::Map(nested));
                }
            }
            (Some(def), cur) if def == cur => {}
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

//! Field values and the value record handed to validators and models.

use indexmap::IndexMap;
use serde::Serialize;

use crate::FormError;

/// Value held by a single field. Text inputs, selects and secrets hold
/// `Text`; checkboxes hold `Bool`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            FieldValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Text(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Bool(_) => "bool",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Ordered record of field values (declaration order of the schema).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormValues(IndexMap<String, FieldValue>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    /// Text content of a field; missing and non-text fields read as `""`.
    pub fn text(&self, key: &str) -> &str {
        self.get(key).and_then(FieldValue::as_text).unwrap_or("")
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(FieldValue::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Owned text of a field that must exist and be textual.
    pub fn require_text(&self, key: &str) -> Result<String, FormError> {
        match self.get(key) {
            Some(FieldValue::Text(s)) => Ok(s.clone()),
            Some(FieldValue::Bool(_)) => Err(FormError::TypeMismatch {
                field: key.to_string(),
                expected: "text",
            }),
            None => Err(FormError::MissingValue(key.to_string())),
        }
    }

    pub fn require_flag(&self, key: &str) -> Result<bool, FormError> {
        match self.get(key) {
            Some(FieldValue::Bool(b)) => Ok(*b),
            Some(FieldValue::Text(_)) => Err(FormError::TypeMismatch {
                field: key.to_string(),
                expected: "bool",
            }),
            None => Err(FormError::MissingValue(key.to_string())),
        }
    }
}

impl FromIterator<(String, FieldValue)> for FormValues {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_text_reads_empty() {
        let values = FormValues::new().with("canReproduce", true);
        assert_eq!(values.text("title"), "");
        assert_eq!(values.text("canReproduce"), "");
        assert_eq!(values.flag("canReproduce"), Some(true));
    }

    #[test]
    fn serializes_in_declaration_order() {
        let values = FormValues::new()
            .with("title", "Broken button")
            .with("canReproduce", true);
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"{"title":"Broken button","canReproduce":true}"#);
    }

    #[test]
    fn require_reports_type_mismatch() {
        let values = FormValues::new().with("canReproduce", true);
        assert!(matches!(
            values.require_text("canReproduce"),
            Err(FormError::TypeMismatch { .. })
        ));
        assert_eq!(
            values.require_flag("bugType"),
            Err(FormError::MissingValue("bugType".into()))
        );
    }
}

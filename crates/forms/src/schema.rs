//! Form schema and the schema validator.
//!
//! `Schema` groups the ordered field declarations of one form with its
//! ordered rule list. [`validate`] is the pure validator: it maps a value
//! record to per-field error messages and has no side effects.
//!
//! ```ignore
//! let schema = Schema::new("Log in", vec![
//!     FormField::new("email", "Email", FieldKind::Email),
//!     FormField::new("password", "Password", FieldKind::Secret),
//! ])
//! .rule(Rule::email("email", "Please enter a valid email address."))
//! .rule(Rule::min_chars("password", 6, "Password must be at least 6 characters long."));
//!
//! let errors = schema.validate(&schema.defaults());
//! assert_eq!(errors.fields().count(), 2);
//! ```

use std::collections::BTreeMap;

use crate::{FormField, FormValues, Rule};

/// Per-field error messages. Empty means valid.
///
/// Within a field, messages keep the order of the rules that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// All messages for a field (empty slice if the field is valid).
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The message typically surfaced for a field.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Names of the fields that have at least one error.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Declarative schema for a multi-field form.
#[derive(Debug, Clone)]
pub struct Schema {
    pub title: String,
    pub description: Option<String>,
    fields: Vec<FormField>,
    rules: Vec<Rule>,
}

impl Schema {
    pub fn new(title: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            title: title.into(),
            description: None,
            fields,
            rules: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Declared default of every field, in declaration order.
    pub fn defaults(&self) -> FormValues {
        self.fields
            .iter()
            .map(|f| (f.key.clone(), f.default.clone()))
            .collect()
    }

    pub fn validate(&self, values: &FormValues) -> ValidationErrors {
        validate(self, values)
    }
}

/// Run every rule of `schema` against `values`.
///
/// Rules never short-circuit each other: all failing rules contribute, and the
/// set of fields with errors does not depend on rule order.
pub fn validate(schema: &Schema, values: &FormValues) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for rule in schema.rules() {
        if let Some(message) = rule.evaluate(values) {
            errors.push(rule.target(), message);
        }
    }
    errors
}

//! Runtime (mutable) state of one form instance.
//!
//! `FormState` holds one `FieldState` per declared field plus the submission
//! lifecycle. It is owned by exactly one form and carries no rendering
//! concerns, so it can be compared and inspected in tests directly.

use indexmap::IndexMap;

use crate::{FieldValue, FormValues, Schema, ValidationErrors};

/// Value, interaction and validation state of one field.
///
/// `touched` only goes from `false` to `true`; only a form reset clears it.
/// `errors` is only rewritten when the form validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldState {
    pub value: FieldValue,
    pub touched: bool,
    pub errors: Vec<String>,
}

impl FieldState {
    fn new(value: FieldValue) -> Self {
        Self {
            value,
            touched: false,
            errors: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors are only shown after the user interacted with the field.
    pub fn is_invalid(&self) -> bool {
        self.touched && !self.is_valid()
    }

    pub fn visible_errors(&self) -> &[String] {
        if self.is_invalid() {
            self.errors.as_slice()
        } else {
            &[]
        }
    }
}

/// Why the last submission did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    /// Local validation failed; nothing was sent anywhere.
    Validation,
    /// The submit action failed; carries the message shown to the user.
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Submission {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed(SubmitFailure),
}

impl Submission {
    pub fn label(&self) -> &'static str {
        match self {
            Submission::Idle => "idle",
            Submission::Submitting => "submitting",
            Submission::Succeeded => "succeeded",
            Submission::Failed(SubmitFailure::Validation) => "failed(validation)",
            Submission::Failed(SubmitFailure::Remote(_)) => "failed(remote)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    fields: IndexMap<String, FieldState>,
    pub submission: Submission,
    /// Number of submit attempts since the last reset.
    pub submit_count: u32,
}

impl FormState {
    /// Fresh state with every field at its declared default.
    pub fn from_schema(schema: &Schema) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|f| (f.key.clone(), FieldState::new(f.default.clone())))
            .collect();
        Self {
            fields,
            submission: Submission::Idle,
            submit_count: 0,
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldState> {
        self.fields.get(key)
    }

    pub(crate) fn field_mut(&mut self, key: &str) -> Option<&mut FieldState> {
        self.fields.get_mut(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldState)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> FormValues {
        self.fields
            .iter()
            .map(|(k, f)| (k.clone(), f.value.clone()))
            .collect()
    }

    pub fn is_submitting(&self) -> bool {
        self.submission == Submission::Submitting
    }

    pub fn is_valid(&self) -> bool {
        self.fields.values().all(FieldState::is_valid)
    }

    pub(crate) fn touch_all(&mut self) {
        for field in self.fields.values_mut() {
            field.touched = true;
        }
    }

    /// Replace every field's errors with the outcome of a validation run.
    pub(crate) fn apply_errors(&mut self, errors: &ValidationErrors) {
        for (key, field) in self.fields.iter_mut() {
            field.errors = errors.get(key).to_vec();
        }
    }
}

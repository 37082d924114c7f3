//! Field declarations.
//!
//! A `FormField` is pure metadata: key, label, input kind, optional help and
//! placeholder text, and the default value the field starts with (and returns
//! to on reset). Validation lives in `rule.rs`, runtime state in `state.rs`.
//!
//! ```ignore
//! let field = FormField::new("password", "Password", FieldKind::Secret)
//!     .help("Enter a password (min. 6 characters)");
//! ```

use crate::FieldValue;

/// Input widget kind of a field.
///
/// - `Text` / `Email` / `Secret` render as single-line inputs (`Secret` is
///   only masked visually, the value is kept plain in state)
/// - `TextArea` is multi-line and may show a character counter
/// - `Bool` is a checkbox
/// - `Select` offers a fixed list of options; an empty value means "nothing chosen"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Secret,
    TextArea { max_chars: Option<usize> },
    Bool,
    Select { options: Vec<String> },
}

/// Declarative description of a form field.
#[derive(Debug, Clone)]
pub struct FormField {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub help: Option<String>,
    pub placeholder: Option<String>,
    pub default: FieldValue,
}

impl FormField {
    /// Create a field; the default is `false` for `Bool`, empty text otherwise.
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        let default = match kind {
            FieldKind::Bool => FieldValue::Bool(false),
            _ => FieldValue::Text(String::new()),
        };
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            help: None,
            placeholder: None,
            default,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = value.into();
        self
    }

    pub fn is_textual(&self) -> bool {
        !matches!(self.kind, FieldKind::Bool)
    }

    pub fn is_secret(&self) -> bool {
        matches!(self.kind, FieldKind::Secret)
    }

    /// Whether `value` has the shape this field stores.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (&self.kind, value) {
            (FieldKind::Bool, FieldValue::Bool(_)) => true,
            (FieldKind::Bool, FieldValue::Text(_)) => false,
            (_, FieldValue::Text(_)) => true,
            (_, FieldValue::Bool(_)) => false,
        }
    }

    pub fn expected_type(&self) -> &'static str {
        if self.is_textual() { "text" } else { "bool" }
    }

    /// Value as shown to the user; secrets are masked.
    pub fn display_value(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Text(s) if self.is_secret() => "•".repeat(s.chars().count()),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }

    /// Character counter for text areas with a limit, e.g. `"42/100 characters"`.
    pub fn counter(&self, value: &FieldValue) -> Option<String> {
        match (&self.kind, value) {
            (FieldKind::TextArea { max_chars: Some(max) }, FieldValue::Text(s)) => {
                Some(format!("{}/{} characters", s.chars().count(), max))
            }
            _ => None,
        }
    }
}

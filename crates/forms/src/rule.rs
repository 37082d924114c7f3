//! Validation rules.
//!
//! A rule is a pure predicate over the whole value record plus the message it
//! produces when the predicate fails. Every rule names one *target* field that
//! receives its error, even when it reads other fields (cross-field rules such
//! as "confirmation must equal password" attach to the confirmation field).

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::FormValues;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(
        r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$"
    )
    .expect("email pattern compiles");
}

/// Syntactic email check (no DNS, no normalisation).
///
/// The local part may not start with a dot or end with `'`; no `..` anywhere.
pub fn is_email(candidate: &str) -> bool {
    !candidate.starts_with('.') && !candidate.contains("..") && EMAIL.is_match(candidate)
}

type Predicate = Arc<dyn Fn(&FormValues) -> bool + Send + Sync>;

/// What a rule checks.
#[derive(Clone)]
pub enum Check {
    /// At least `n` characters. Empty or whitespace-only text always fails.
    MinChars(usize),
    /// At most `n` characters.
    MaxChars(usize),
    Email,
    /// The value must be one of the listed options.
    OneOf(Vec<String>),
    /// The target must equal the text of another field.
    EqualsField(String),
    Custom(Predicate),
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::MinChars(n) => write!(f, "MinChars({n})"),
            Check::MaxChars(n) => write!(f, "MaxChars({n})"),
            Check::Email => f.write_str("Email"),
            Check::OneOf(options) => f.debug_tuple("OneOf").field(options).finish(),
            Check::EqualsField(other) => f.debug_tuple("EqualsField").field(other).finish(),
            Check::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    target: String,
    check: Check,
    message: String,
}

impl Rule {
    pub fn new(target: impl Into<String>, check: Check, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            check,
            message: message.into(),
        }
    }

    pub fn min_chars(field: impl Into<String>, n: usize, message: impl Into<String>) -> Self {
        Self::new(field, Check::MinChars(n), message)
    }

    pub fn max_chars(field: impl Into<String>, n: usize, message: impl Into<String>) -> Self {
        Self::new(field, Check::MaxChars(n), message)
    }

    pub fn email(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, Check::Email, message)
    }

    pub fn one_of<I, S>(field: impl Into<String>, options: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::new(field, Check::OneOf(options), message)
    }

    /// `target` must equal `other`; the error lands on `target`.
    pub fn must_match(
        target: impl Into<String>,
        other: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(target, Check::EqualsField(other.into()), message)
    }

    pub fn custom(
        target: impl Into<String>,
        message: impl Into<String>,
        predicate: impl Fn(&FormValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(target, Check::Custom(Arc::new(predicate)), message)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn check(&self) -> &Check {
        &self.check
    }

    /// True when the values satisfy this rule.
    pub fn passes(&self, values: &FormValues) -> bool {
        let value = values.get(&self.target);
        let text = value.and_then(|v| v.as_text());
        match &self.check {
            Check::MinChars(n) => match text {
                Some(s) if s.trim().is_empty() => *n == 0,
                Some(s) => s.chars().count() >= *n,
                None => false,
            },
            Check::MaxChars(n) => text.is_some_and(|s| s.chars().count() <= *n),
            Check::Email => text.is_some_and(is_email),
            Check::OneOf(options) => text.is_some_and(|s| options.iter().any(|o| o == s)),
            Check::EqualsField(other) => {
                value.is_some() && values.get(other.as_str()) == value
            }
            Check::Custom(predicate) => predicate(values),
        }
    }

    /// The rule's message if it fails, `None` otherwise.
    pub fn evaluate(&self, values: &FormValues) -> Option<&str> {
        if self.passes(values) {
            None
        } else {
            Some(&self.message)
        }
    }
}

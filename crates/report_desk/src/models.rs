//! The three forms of the desk: log in, create account and bug report.

use std::fmt;

use forms::{FieldKind, FormError, FormField, FormModel, FormValues, Rule, Schema};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

pub const EMAIL_INVALID: &str = "Please enter a valid email address.";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters long.";
pub const PASSWORDS_DIFFER: &str = "Passwords don't match";
pub const TITLE_TOO_SHORT: &str = "Bug title must be at least 5 characters.";
pub const TITLE_TOO_LONG: &str = "Bug title must be at most 32 characters.";
pub const DESCRIPTION_TOO_SHORT: &str = "Description must be at least 20 characters.";
pub const DESCRIPTION_TOO_LONG: &str = "Description must be at most 100 characters.";
pub const BUG_TYPE_MISSING: &str = "Please select an option";

const MIN_PASSWORD: usize = 6;
const TITLE_CHARS: (usize, usize) = (5, 32);
const DESCRIPTION_CHARS: (usize, usize) = (20, 100);

fn email_field() -> FormField {
    FormField::new("email", "Email", FieldKind::Email).placeholder("example@example.com")
}

fn password_field() -> FormField {
    FormField::new("password", "Password", FieldKind::Secret)
        .help("Enter a password (min. 6 characters)")
}

fn credential_rules(schema: Schema) -> Schema {
    schema
        .rule(Rule::email("email", EMAIL_INVALID))
        .rule(Rule::min_chars("password", MIN_PASSWORD, PASSWORD_TOO_SHORT))
}

#[derive(Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl FormModel for LoginForm {
    const NAME: &'static str = "login";

    fn schema() -> Schema {
        credential_rules(
            Schema::new("Log in", vec![email_field(), password_field()])
                .description("Please provide email and password."),
        )
    }

    fn from_values(values: &FormValues) -> Result<Self, FormError> {
        Ok(Self {
            email: values.require_text("email")?,
            password: values.require_text("password")?,
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl FormModel for SignupForm {
    const NAME: &'static str = "signup";

    fn schema() -> Schema {
        let confirm = FormField::new("confirmPassword", "Confirm Password", FieldKind::Secret)
            .help("Repeat your password. It must match the password above.");
        credential_rules(
            Schema::new(
                "Create account",
                vec![email_field(), password_field(), confirm],
            )
            .description("Please provide email and password."),
        )
        .rule(Rule::must_match(
            "confirmPassword",
            "password",
            PASSWORDS_DIFFER,
        ))
    }

    // the confirmation is only needed for validation
    fn from_values(values: &FormValues) -> Result<Self, FormError> {
        Ok(Self {
            email: values.require_text("email")?,
            password: values.require_text("password")?,
        })
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum BugType {
    #[serde(rename = "UI/UX")]
    #[strum(serialize = "UI/UX")]
    UiUx,
    Functionality,
    Performance,
    Security,
}

/// A validated bug report, serialised with the form's field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugReport {
    pub title: String,
    pub description: String,
    pub can_reproduce: bool,
    pub bug_type: BugType,
}

impl FormModel for BugReport {
    const NAME: &'static str = "bug-report";

    fn schema() -> Schema {
        let options: Vec<String> = BugType::iter().map(|t| t.to_string()).collect();
        Schema::new(
            "Bug Report",
            vec![
                FormField::new("title", "Bug Title", FieldKind::Text)
                    .placeholder("Login button not working on mobile"),
                FormField::new(
                    "description",
                    "Description",
                    FieldKind::TextArea {
                        max_chars: Some(DESCRIPTION_CHARS.1),
                    },
                )
                .placeholder("I'm having an issue with the login button on mobile.")
                .help("Include steps to reproduce, expected behavior, and what actually happened."),
                FormField::new(
                    "canReproduce",
                    "I can consistently reproduce this bug",
                    FieldKind::Bool,
                )
                .default_value(true),
                FormField::new(
                    "bugType",
                    "Bug Type",
                    FieldKind::Select {
                        options: options.clone(),
                    },
                )
                .placeholder("Select a bug type"),
            ],
        )
        .description("Help us improve by reporting bugs you encounter.")
        .rule(Rule::min_chars("title", TITLE_CHARS.0, TITLE_TOO_SHORT))
        .rule(Rule::max_chars("title", TITLE_CHARS.1, TITLE_TOO_LONG))
        .rule(Rule::min_chars(
            "description",
            DESCRIPTION_CHARS.0,
            DESCRIPTION_TOO_SHORT,
        ))
        .rule(Rule::max_chars(
            "description",
            DESCRIPTION_CHARS.1,
            DESCRIPTION_TOO_LONG,
        ))
        .rule(Rule::one_of("bugType", options, BUG_TYPE_MISSING))
    }

    fn from_values(values: &FormValues) -> Result<Self, FormError> {
        let bug_type = values.require_text("bugType")?;
        let bug_type = bug_type
            .parse::<BugType>()
            .map_err(|_| FormError::InvalidChoice {
                field: "bugType".into(),
                value: bug_type.clone(),
            })?;
        Ok(Self {
            title: values.require_text("title")?,
            description: values.require_text("description")?,
            can_reproduce: values.require_flag("canReproduce")?,
            bug_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_scenario_values_are_valid() {
        let values = FormValues::new()
            .with("email", "user@example.com")
            .with("password", "secret");
        assert!(LoginForm::schema().validate(&values).is_empty());
    }

    #[test]
    fn short_password_only_flags_password() {
        let values = FormValues::new()
            .with("email", "user@example.com")
            .with("password", "ab1");
        let errors = LoginForm::schema().validate(&values);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["password"]);
        assert_eq!(errors.first("password"), Some(PASSWORD_TOO_SHORT));
    }

    #[test]
    fn signup_mismatch_lands_on_confirmation() {
        let values = FormValues::new()
            .with("email", "user@example.com")
            .with("password", "secret")
            .with("confirmPassword", "secreT");
        let errors = SignupForm::schema().validate(&values);
        assert_eq!(errors.first("confirmPassword"), Some(PASSWORDS_DIFFER));
        assert!(!errors.contains("password"));
    }

    #[test]
    fn bug_report_defaults() {
        let defaults = BugReport::schema().defaults();
        assert_eq!(defaults.flag("canReproduce"), Some(true));
        assert_eq!(defaults.text("bugType"), "");

        let errors = BugReport::schema().validate(&defaults);
        assert_eq!(errors.first("title"), Some(TITLE_TOO_SHORT));
        assert_eq!(errors.first("description"), Some(DESCRIPTION_TOO_SHORT));
        assert_eq!(errors.first("bugType"), Some(BUG_TYPE_MISSING));
        assert!(!errors.contains("canReproduce"));
    }

    #[test]
    fn bug_report_length_bounds() {
        let values = FormValues::new()
            .with("title", "x".repeat(33))
            .with("description", "y".repeat(101))
            .with("canReproduce", false)
            .with("bugType", "Performance");
        let errors = BugReport::schema().validate(&values);
        assert_eq!(errors.get("title"), [TITLE_TOO_LONG]);
        assert_eq!(errors.get("description"), [DESCRIPTION_TOO_LONG]);
    }

    #[test]
    fn bug_report_serialises_with_form_names() {
        let values = FormValues::new()
            .with("title", "Broken login")
            .with("description", "The button does nothing on mobile.")
            .with("canReproduce", true)
            .with("bugType", "UI/UX");
        let report = BugReport::from_values(&values).unwrap();
        assert_eq!(report.bug_type, BugType::UiUx);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["bugType"], "UI/UX");
        assert_eq!(json["canReproduce"], true);
    }

    #[test]
    fn credentials_never_show_password() {
        let form = LoginForm {
            email: "a@b.co".into(),
            password: "hunter22".into(),
        };
        assert!(!format!("{form:?}").contains("hunter22"));
    }
}

//! Reactive form/validation pipeline shared by every form of the shell.
//!
//! Module map:
//! - `value.rs`  : `FieldValue`, `FormValues`
//! - `field.rs`  : `FieldKind`, `FormField` (declarations)
//! - `rule.rs`   : `Rule`, `Check` (validation rules, incl. cross-field)
//! - `schema.rs` : `Schema`, `ValidationErrors`, the pure `validate`
//! - `state.rs`  : `FieldState`, `FormState`, `Submission`
//! - `form.rs`   : `Form<M>` engine, `FormModel`, `FieldBinding`

mod error;
mod field;
mod form;
mod rule;
mod schema;
mod state;
mod value;

pub use error::FormError;
pub use field::{FieldKind, FormField};
pub use form::{FieldBinding, Form, FormModel, SubmitOutcome};
pub use rule::{Check, Rule, is_email};
pub use schema::{Schema, ValidationErrors, validate};
pub use state::{FieldState, FormState, Submission, SubmitFailure};
pub use value::{FieldValue, FormValues};

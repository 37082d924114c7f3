use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("field {field} expects a {expected} value")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    #[error("missing value for field: {0}")]
    MissingValue(String),

    #[error("invalid choice {value:?} for field {field}")]
    InvalidChoice { field: String, value: String },
}

//! Error types for the Kolab format codec

use thiserror::Error;

/// Errors that can occur while loading or saving a Kolab object
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Malformed Kolab XML: {0}")]
    Parse(String),

    #[error("UID not found in Kolab XML object")]
    MissingUid,

    #[error("Data value for {0} is empty in Kolab XML object")]
    MissingRequiredField(String),

    #[error("Kolab XML: missing calculated field handler {0}")]
    UnknownCalculatedHook(String),

    #[error("Recurrence tag error: {0}")]
    RecurrenceValidation(String),

    #[error("Not a Kolab {expected} object (root element is <{found}>)")]
    InvalidRoot { expected: String, found: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid field schema: {0}")]
    InvalidSchema(String),

    #[error("Unable to write Kolab XML: {0}")]
    Write(#[from] std::io::Error),
}

impl FormatError {
    /// The error to raise when a required field has no value.
    /// A missing `uid` is reported on its own, since no Kolab object can exist without one.
    pub(crate) fn missing(name: &str) -> Self {
        if name == "uid" {
            FormatError::MissingUid
        } else {
            FormatError::MissingRequiredField(name.to_string())
        }
    }

    pub(crate) fn invalid_value<R: ToString>(field: &str, reason: R) -> Self {
        FormatError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for codec operations
pub type FormatResult<T> = Result<T, FormatError>;

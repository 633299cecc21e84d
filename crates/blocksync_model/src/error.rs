//! Error types for the data model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while decoding or validating model values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A required field was absent from a wire object.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A field was present but had an unusable value.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A string could not be read as a remote document id.
    #[error("invalid remote id: {0}")]
    InvalidId(String),

    /// The front matter block could not be parsed or rendered.
    #[error("front matter error: {0}")]
    FrontMatter(String),
}

impl ModelError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::MissingField("id".into());
        assert_eq!(err.to_string(), "missing field: id");

        let err = ModelError::invalid_field("last_edited_time", "not a timestamp");
        assert!(err.to_string().contains("last_edited_time"));
        assert!(err.to_string().contains("not a timestamp"));
    }
}

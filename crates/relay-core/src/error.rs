//! Shared error definitions.

/// The result type used throughout relay-core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared across Relay components.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An identifier failed to parse.
    #[error("invalid id: {message}")]
    InvalidId {
        /// Description of the parse failure.
        message: String,
    },

    /// Input failed validation.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

impl Error {
    /// Creates a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_id_display() {
        let err = Error::InvalidId {
            message: "not a uuid".into(),
        };
        assert!(err.to_string().contains("invalid id"));
    }

    #[test]
    fn validation_display() {
        let err = Error::validation("sourceSystem must not be empty");
        assert!(err.to_string().contains("sourceSystem"));
    }
}

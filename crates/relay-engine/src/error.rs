//! Error types for the relay domain.

use relay_core::TaskId;

use crate::task::TaskStatus;

/// The result type used throughout relay-engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in delivery-pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A task with this id already exists in the store.
    #[error("duplicate task id: {task_id}")]
    DuplicateTask {
        /// The id that was already present.
        task_id: TaskId,
    },

    /// A task was not found in the store.
    #[error("task not found: {task_id}")]
    TaskNotFound {
        /// The task ID that was not found.
        task_id: TaskId,
    },

    /// Manual retry was requested for a task that is not terminally failed.
    #[error("task {task_id} is {status}, only FAILED tasks can be retried")]
    RetryNotAllowed {
        /// The task that was targeted.
        task_id: TaskId,
        /// Its current status.
        status: TaskStatus,
    },

    /// An invalid state transition was attempted.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// The current status.
        from: TaskStatus,
        /// The attempted target status.
        to: TaskStatus,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// The engine was configured with invalid settings.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// An error from relay-core.
    #[error("core error: {0}")]
    Core(#[from] relay_core::Error),
}

impl Error {
    /// Creates a new storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn duplicate_task_display() {
        let id = TaskId::generate();
        let err = Error::DuplicateTask { task_id: id };
        assert!(err.to_string().contains("duplicate task id"));
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn retry_not_allowed_display() {
        let err = Error::RetryNotAllowed {
            task_id: TaskId::generate(),
            status: TaskStatus::Processing,
        };
        let msg = err.to_string();
        assert!(msg.contains("PROCESSING"));
        assert!(msg.contains("FAILED"));
    }

    #[test]
    fn storage_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "row missing");
        let err = Error::storage_with_source("failed to load task", source);
        assert!(err.to_string().contains("storage error"));
        assert!(StdError::source(&err).is_some());
    }
}

//! Error types returned by registration, configuration and materialization.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, HostingError>;

/// Errors raised while declaring or materializing Temporal services.
#[derive(Debug, Error)]
pub enum HostingError {
    /// A required argument was missing or blank.
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        argument: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A hosted worker for this task queue has already been declared.
    #[error("a hosted worker for task queue `{task_queue}` is already registered")]
    DuplicateRegistration {
        /// The task queue registered twice.
        task_queue: String,
    },

    /// No keyed singleton of the requested type was registered under `key`.
    #[error("no `{service}` service registered under key `{key}`")]
    ServiceNotRegistered {
        /// Type name of the requested service.
        service: &'static str,
        /// Key the lookup used.
        key: String,
    },

    /// A keyed singleton produced a value of a different type than requested.
    #[error("service registered under key `{key}` is not a `{expected}`")]
    ServiceTypeMismatch {
        /// Type name the caller asked for.
        expected: &'static str,
        /// Key the lookup used.
        key: String,
    },

    /// No hosted worker has been declared for this task queue.
    #[error("no hosted worker registered for task queue `{0}`")]
    UnknownWorker(String),

    /// The lazy client failed to establish its connection.
    #[error("failed to connect Temporal client for `{target_host}`")]
    Connect {
        /// Address the client tried to reach.
        target_host: String,
        /// Error returned by the connector.
        #[source]
        source: anyhow::Error,
    },

    /// A required environment variable was missing or malformed.
    #[error("environment: {0}")]
    Environment(String),
}

impl HostingError {
    pub(crate) fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }
}

/// Rejects empty or whitespace-only values for a required string argument.
pub(crate) fn require_non_blank(argument: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HostingError::invalid_argument(
            argument,
            "must not be empty",
        ));
    }
    Ok(())
}

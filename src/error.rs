//! Error types for the environment engine.

use std::time::Duration;

/// Result type alias for environment engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reconciling an environment.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// Input rejected before anything reached the backend.
    #[error("validation failed: {0}")]
    Validation(String),

    // =========================================================================
    // Config Model Errors
    // =========================================================================
    /// No site with the given hostname (or full value) exists in the config.
    #[error("site not found: {0}")]
    SiteNotFound(String),

    // =========================================================================
    // Runner Errors
    // =========================================================================
    /// An action in a sequence failed. Prior actions are not rolled back;
    /// re-running the full sequence is the recovery mechanism.
    #[error("action {index} ({command}) failed: {reason}")]
    ActionFailed {
        /// Zero-based index of the failing action.
        index: usize,
        /// The remote command that failed, space-joined for context.
        command: String,
        /// Why the action failed.
        reason: String,
    },

    /// A backend call failed or returned a non-success result.
    #[error("backend transport error: {0}")]
    Transport(String),

    /// No container matched a query.
    #[error("no container matched environment '{environment}' with role '{role}'")]
    NoMatchingContainer {
        /// Environment label value that was queried.
        environment: String,
        /// Role label value that was queried.
        role: String,
    },

    // =========================================================================
    // Remote Command Protocol Errors
    // =========================================================================
    /// The copy-out target was not a regular file.
    #[error("copy target '{path}' is not a regular file")]
    InvalidArtifact {
        /// Path inside the container that was requested.
        path: String,
    },

    /// No backup dialect is registered for a database engine.
    #[error("no backup dialect registered for engine '{0}'")]
    UnsupportedEngine(String),

    /// A bounded wait elapsed before the remote command completed.
    #[error("operation timed out after {duration:?}: {operation}")]
    Timeout {
        /// What was being waited on.
        operation: String,
        /// How long the caller was willing to wait.
        duration: Duration,
    },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file (de)serialization error.
    #[error("config serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

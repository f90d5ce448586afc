//! Error types for celldeploy-mgmt

use thiserror::Error;

/// Errors raised by a management connection
#[derive(Error, Debug, Clone)]
pub enum MgmtError {
    /// Failed to reach the management endpoint
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The endpoint rejected a management command
    #[error("command {command} failed: {message}")]
    CommandFailed {
        /// Command name, e.g. `startApplication`
        command: String,
        /// Reason reported by the endpoint
        message: String,
    },

    /// Object name could not be parsed
    #[error("malformed object name {name:?}: {reason}")]
    MalformedObjectName {
        /// Raw name
        name: String,
        /// What was wrong with it
        reason: String,
    },
}

//! Core error types for celldeploy-core

use std::time::Duration;

use celldeploy_mgmt::MgmtError;
use thiserror::Error;

use crate::state::DeployPhase;

/// Errors that can occur while deploying or undeploying
#[derive(Error, Debug, Clone)]
pub enum DeployError {
    /// Endpoint unreachable or not a deployable target
    #[error("connection error: {0}")]
    Connection(String),

    /// Archive failed descriptor validation
    #[error("unable to complete all task data for deployment preparation: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Install notification reported failure
    #[error("application not successfully deployed: {0}")]
    DeploymentFailed(String),

    /// Distribution never reached every node
    #[error("distribution of application did not succeed to all nodes after {attempts} attempts")]
    DistributionTimeout {
        /// Number of status queries issued
        attempts: u32,
    },

    /// Composite status contained no votes
    #[error("reported distribution status is invalid: {0}")]
    IllegalAggregationState(String),

    /// A composite status token could not be read
    #[error("malformed distribution status: {0}")]
    MalformedStatus(String),

    /// Uninstall notification reported failure
    #[error("application not successfully undeployed: {0}")]
    UndeployFailed(String),

    /// Archive display name has no extension
    #[error("invalid archive name: {0:?}")]
    InvalidArchiveName(String),

    /// Exporting the archive failed
    #[error("archive export failed: {0}")]
    Archive(String),

    /// Invalid phase transition attempted
    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition {
        /// Current phase
        from: DeployPhase,
        /// Attempted target phase
        to: DeployPhase,
    },

    /// A management command was rejected
    #[error("management command failed: {0}")]
    Management(#[from] MgmtError),

    /// The session's rendezvous was closed while waiting
    #[error("notification channel closed")]
    RendezvousClosed,

    /// Configured notification timeout elapsed
    #[error("no completion notification within {0:?}")]
    NotificationTimeout(Duration),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

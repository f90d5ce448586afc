//! Deployment phase state machine

use std::fmt;

use chrono::{DateTime, Utc};

/// Phases of a `DeploymentJob`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Preparing,
    Installing,
    AwaitingInstallAck,
    Distributing,
    Starting,
    Done,
    Failed,
}

impl DeployPhase {
    /// Whether `next` follows this phase
    ///
    /// Phases only move forward one step; every non-terminal phase may fail.
    #[must_use]
    pub fn can_transition_to(self, next: DeployPhase) -> bool {
        use DeployPhase::{
            AwaitingInstallAck, Distributing, Done, Failed, Installing, Preparing, Starting,
        };

        if self.is_terminal() {
            return false;
        }

        match (self, next) {
            (_, Failed) => true,
            (Preparing, Installing)
            | (Installing, AwaitingInstallAck)
            | (AwaitingInstallAck, Distributing)
            | (Distributing, Starting)
            | (Starting, Done) => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DeployPhase::Done | DeployPhase::Failed)
    }
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployPhase::Preparing => "preparing",
            DeployPhase::Installing => "installing",
            DeployPhase::AwaitingInstallAck => "awaiting_install_ack",
            DeployPhase::Distributing => "distributing",
            DeployPhase::Starting => "starting",
            DeployPhase::Done => "done",
            DeployPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Context kept for a job that entered `Failed`
#[derive(Debug, Clone)]
pub struct FailedContext {
    /// Phase the job was in when it failed
    pub previous_phase: DeployPhase,
    /// Error message
    pub error: String,
    /// When the job failed
    pub failed_at: DateTime<Utc>,
}

impl FailedContext {
    pub fn new(previous_phase: DeployPhase, error: impl Into<String>) -> Self {
        Self {
            previous_phase,
            error: error.into(),
            failed_at: Utc::now(),
        }
    }
}

/// Application name and extension derived from an archive display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    /// Display name up to the final `.`
    pub app_name: String,
    /// Final `.` and everything after it
    pub extension: String,
}

impl ArchiveName {
    /// Split a display name at its final `.`
    ///
    /// Returns `None` when there is no `.` or nothing precedes it.
    #[must_use]
    pub fn parse(display_name: &str) -> Option<Self> {
        let idx = display_name.rfind('.')?;
        if idx == 0 {
            return None;
        }
        Some(Self {
            app_name: display_name[..idx].to_string(),
            extension: display_name[idx..].to_string(),
        })
    }
}

/// One `deploy()` call, kept by the `Deployer` once it ends
#[derive(Debug, Clone)]
pub struct DeploymentJob {
    /// Archive display name, e.g. `shop.war`
    pub archive_name: String,
    /// Application name and extension derived from `archive_name`
    pub name: ArchiveName,
    /// Target server identity
    pub target: String,
    /// Current phase
    pub phase: DeployPhase,
    /// When `deploy()` was called
    pub started_at: DateTime<Utc>,
    /// Set once the job entered `Failed`
    pub failed: Option<FailedContext>,
}

impl DeploymentJob {
    pub fn new(archive_name: impl Into<String>, name: ArchiveName, target: impl Into<String>) -> Self {
        Self {
            archive_name: archive_name.into(),
            name,
            target: target.into(),
            phase: DeployPhase::Preparing,
            started_at: Utc::now(),
            failed: None,
        }
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.name.app_name
    }
}

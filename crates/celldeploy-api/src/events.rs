//! Deployment event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeployEvent {
    PhaseChanged {
        app: String,
        from: String,
        to: String,
    },
    DistributionProgress {
        app: String,
        attempt: u32,
        state: String,
    },
    Deployed {
        app: String,
        targets: String,
        at: DateTime<Utc>,
    },
    Undeployed {
        app: String,
        at: DateTime<Utc>,
    },
    Failed {
        app: String,
        phase: String,
        error: String,
    },
}

impl DeployEvent {
    /// Application the event refers to
    #[must_use]
    pub fn app(&self) -> &str {
        match self {
            DeployEvent::PhaseChanged { app, .. }
            | DeployEvent::DistributionProgress { app, .. }
            | DeployEvent::Deployed { app, .. }
            | DeployEvent::Undeployed { app, .. }
            | DeployEvent::Failed { app, .. } => app,
        }
    }
}

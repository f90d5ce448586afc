//! Message types for actor communication
//!
//! Message handlers are implemented in `actor::deployer`.

use std::sync::Arc;

use celldeploy_api::DeployEvent;
use kameo_macros::Reply;
use tokio::sync::broadcast;

use crate::archive::Archive;
use crate::state::DeploymentJob;

/// Deploy an archive and wait until it runs
pub struct Deploy {
    /// Archive to deploy
    pub archive: Arc<dyn Archive>,
}

impl std::fmt::Debug for Deploy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deploy")
            .field("archive", &self.archive.name())
            .finish()
    }
}

/// Uninstall an application by name
#[derive(Debug)]
pub struct Undeploy {
    /// Application name, the archive name without extension
    pub app_name: String,
}

/// Get a receiver for deployment events
#[derive(Debug)]
pub struct SubscribeEvents;

/// Deployment event receiver
#[derive(Debug, Reply)]
pub struct EventReceiver(pub broadcast::Receiver<DeployEvent>);

/// Get the most recent deployment job
#[derive(Debug)]
pub struct QueryLastJob;

/// Most recent deployment job, if any ran in this session
#[derive(Debug, Reply)]
pub struct LastJob(pub Option<DeploymentJob>);

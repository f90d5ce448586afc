//! `DeployerActor`: one container session
//!
//! Owns a `Deployer` and runs its orchestrations one at a time.

use celldeploy_api::ProtocolMetadata;
use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tracing::info;

use crate::deployer::Deployer;
use crate::error::DeployError;
use crate::message::{Deploy, EventReceiver, LastJob, QueryLastJob, SubscribeEvents, Undeploy};

/// Arguments for spawning a `DeployerActor`
pub struct DeployerActorArgs {
    /// Deployer bound to an already validated management session
    pub deployer: Deployer,
}

/// Container session actor
pub struct DeployerActor {
    deployer: Deployer,
    /// Successful deployments in this session
    deployed: u64,
}

impl DeployerActor {
    #[must_use]
    pub fn deployer(&self) -> &Deployer {
        &self.deployer
    }
}

impl Actor for DeployerActor {
    type Args = DeployerActorArgs;
    type Error = DeployError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        info!(
            id = %actor_ref.id(),
            server = %args.deployer.handle().identity(),
            "DeployerActor starting"
        );

        Ok(Self {
            deployer: args.deployer,
            deployed: 0,
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        info!(
            server = %self.deployer.handle().identity(),
            deployed = self.deployed,
            reason = ?reason,
            "DeployerActor stopping"
        );

        self.deployer.handle().close();

        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<Deploy> for DeployerActor {
    type Reply = Result<ProtocolMetadata, DeployError>;

    async fn handle(&mut self, msg: Deploy, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        let metadata = self.deployer.deploy(msg.archive.as_ref()).await?;
        self.deployed += 1;
        Ok(metadata)
    }
}

impl Message<Undeploy> for DeployerActor {
    type Reply = Result<(), DeployError>;

    async fn handle(
        &mut self,
        msg: Undeploy,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.deployer.undeploy(&msg.app_name).await
    }
}

impl Message<SubscribeEvents> for DeployerActor {
    type Reply = EventReceiver;

    async fn handle(
        &mut self,
        _msg: SubscribeEvents,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        EventReceiver(self.deployer.subscribe())
    }
}

impl Message<QueryLastJob> for DeployerActor {
    type Reply = LastJob;

    async fn handle(
        &mut self,
        _msg: QueryLastJob,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        LastJob(self.deployer.last_job())
    }
}

//! celldeploy-core: Deployment orchestration
//!
//! Opens a validated management session, then installs, distributes and
//! starts applications on it, synchronizing with the endpoint's asynchronous
//! notifications. `DeployerActor` wraps a `Deployer` as a kameo actor.

pub mod actor;
pub mod archive;
pub mod config;
pub mod deployer;
pub mod distribution;
pub mod error;
pub mod gate;
pub mod message;
pub mod rendezvous;
pub mod state;

pub use actor::{DeployerActor, DeployerActorArgs};
pub use archive::{Archive, DescriptorValidator, ExportedArchive, FileArchive, SkipValidation};
pub use config::{ContainerConfig, DistributionPolicy};
pub use deployer::{DeploySettings, Deployer};
pub use distribution::{AggregateState, DistributionPoller, DistributionVote};
pub use error::DeployError;
pub use gate::{ConnectionGate, DISALLOWED_PROCESS_TYPES, ManagementHandle, ServerIdentity};
pub use message::{Deploy, EventReceiver, LastJob, QueryLastJob, SubscribeEvents, Undeploy};
pub use rendezvous::{NotificationFilter, Rendezvous, Subscription};
pub use state::{ArchiveName, DeployPhase, DeploymentJob, FailedContext};

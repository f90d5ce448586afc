//! Actor implementations

pub mod deployer;

pub use deployer::{DeployerActor, DeployerActorArgs};

//! `Deployer`: install, distribute and start an application; uninstall it again
//!
//! One `Deployer` owns one `ManagementHandle`. It runs a single orchestration
//! at a time; callers sharing it across tasks must serialize calls themselves
//! (`DeployerActor` does this through its mailbox).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use celldeploy_api::{DeployEvent, ProtocolDescription, ProtocolMetadata};
use celldeploy_mgmt::{InstallOptions, NotificationKind};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use crate::archive::{Archive, DescriptorValidator, ExportedArchive};
use crate::config::{ContainerConfig, DistributionPolicy};
use crate::distribution::DistributionPoller;
use crate::error::DeployError;
use crate::gate::ManagementHandle;
use crate::rendezvous::NotificationFilter;
use crate::state::{ArchiveName, DeployPhase, DeploymentJob, FailedContext};

/// Settings for deploy/undeploy orchestration
#[derive(Debug, Clone)]
pub struct DeploySettings {
    /// Host test clients connect to
    pub http_host: String,
    /// HTTP port test clients connect to
    pub http_port: u16,
    /// Distribution status polling bounds
    pub distribution: DistributionPolicy,
    /// Bound on install/uninstall notification waits; `None` waits forever
    pub notification_timeout: Option<Duration>,
    /// Capacity of the deployment event channel
    pub event_channel_capacity: usize,
}

impl DeploySettings {
    #[must_use]
    pub fn from_config(config: &ContainerConfig) -> Self {
        Self {
            http_host: config.remote_server_address.clone(),
            http_port: config.remote_server_http_port,
            distribution: config.distribution.clone(),
            notification_timeout: config.notification_timeout(),
            event_channel_capacity: 256,
        }
    }
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self::from_config(&ContainerConfig::default())
    }
}

/// Orchestrates deployments against one management session
pub struct Deployer {
    /// Validated management session
    handle: ManagementHandle,
    /// Checks exported archives before install
    validator: Arc<dyn DescriptorValidator>,
    /// Orchestration settings
    settings: DeploySettings,
    /// Deployment event channel
    event_tx: broadcast::Sender<DeployEvent>,
    /// Most recent deployment, successful or not
    last_job: Mutex<Option<DeploymentJob>>,
}

impl Deployer {
    pub fn new(
        handle: ManagementHandle,
        validator: Arc<dyn DescriptorValidator>,
        settings: DeploySettings,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(settings.event_channel_capacity.max(1));
        Self {
            handle,
            validator,
            settings,
            event_tx,
            last_job: Mutex::new(None),
        }
    }

    /// Receive deployment events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeployEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub fn handle(&self) -> &ManagementHandle {
        &self.handle
    }

    #[must_use]
    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    /// The most recent deployment job, with its failure context if it failed
    #[must_use]
    pub fn last_job(&self) -> Option<DeploymentJob> {
        self.last_job
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remote execution protocol test clients should use
    #[must_use]
    pub fn default_protocol(&self) -> ProtocolDescription {
        ProtocolDescription::default()
    }

    /// Deploy `archive` and wait until it runs on every node
    ///
    /// The exported copy of the archive is removed before this returns,
    /// whatever the outcome.
    ///
    /// # Errors
    /// Returns the first error of any phase; nothing is retried except the
    /// distribution status query
    #[instrument(skip_all, fields(archive = %archive.name()))]
    pub async fn deploy(&self, archive: &dyn Archive) -> Result<ProtocolMetadata, DeployError> {
        let name = parse_archive_name(archive.name())?;
        let mut job = DeploymentJob::new(archive.name(), name, self.handle.identity().to_string());

        let result = self.run_deploy(&mut job, archive).await;
        match &result {
            Ok(_) => {
                let elapsed = Utc::now() - job.started_at;
                info!(
                    app = %job.app_name(),
                    archive = %job.archive_name,
                    elapsed_ms = elapsed.num_milliseconds(),
                    "deployment complete"
                );
            }
            Err(e) => self.fail(&mut job, e),
        }

        *self.last_job.lock().unwrap_or_else(PoisonError::into_inner) = Some(job);
        result
    }

    async fn run_deploy(
        &self,
        job: &mut DeploymentJob,
        archive: &dyn Archive,
    ) -> Result<ProtocolMetadata, DeployError> {
        let exported = ExportedArchive::export(archive, &job.name)?;

        let diagnostics = self.validator.validate(exported.path()).await;
        if !diagnostics.is_empty() {
            return Err(DeployError::Validation(diagnostics));
        }

        self.transition(job, DeployPhase::Installing)?;

        let correlation = NotificationKind::Install.correlation_for(job.app_name());
        let options = InstallOptions::for_target(job.target.clone(), correlation.clone());
        info!(app = %job.app_name(), server = %job.target, "installing application");

        let subscription = self.handle.rendezvous().subscribe(
            NotificationFilter::new(NotificationKind::Install).with_correlation(correlation),
        );
        self.handle
            .client()
            .install_application(exported.path(), job.app_name(), &options)
            .await?;

        self.transition(job, DeployPhase::AwaitingInstallAck)?;

        let delivered = subscription
            .wait_timeout(self.settings.notification_timeout)
            .await?;
        if !delivered.success {
            return Err(DeployError::DeploymentFailed(delivered.message));
        }

        self.transition(job, DeployPhase::Distributing)?;

        DistributionPoller::new(&self.handle, self.settings.distribution.clone())
            .with_wait_limit(self.settings.notification_timeout)
            .with_events(self.event_tx.clone())
            .run(job.app_name())
            .await?;

        self.transition(job, DeployPhase::Starting)?;

        let targets = self
            .handle
            .client()
            .start_application(job.app_name())
            .await?;
        info!(app = %job.app_name(), targets = %targets, "application started");

        self.transition(job, DeployPhase::Done)?;

        let _ = self.event_tx.send(DeployEvent::Deployed {
            app: job.app_name().to_string(),
            targets,
            at: Utc::now(),
        });

        Ok(ProtocolMetadata::for_servlet_runner(
            &self.settings.http_host,
            self.settings.http_port,
        ))
    }

    /// Uninstall `app_name`
    ///
    /// # Errors
    /// Returns `DeployError::UndeployFailed` if the endpoint reports failure,
    /// or the error of the uninstall command or the wait
    #[instrument(skip(self))]
    pub async fn undeploy(&self, app_name: &str) -> Result<(), DeployError> {
        let correlation = NotificationKind::Uninstall.correlation_for(app_name);
        let subscription = self.handle.rendezvous().subscribe(
            NotificationFilter::new(NotificationKind::Uninstall).with_correlation(&correlation),
        );

        info!(app = %app_name, "uninstalling application");

        let result = subscription
            .issue(
                self.handle
                    .client()
                    .uninstall_application(app_name, &correlation),
                self.settings.notification_timeout,
            )
            .await
            .and_then(|((), delivered)| {
                if delivered.success {
                    Ok(())
                } else {
                    Err(DeployError::UndeployFailed(delivered.message))
                }
            });

        match &result {
            Ok(()) => {
                info!(app = %app_name, "application uninstalled");
                let _ = self.event_tx.send(DeployEvent::Undeployed {
                    app: app_name.to_string(),
                    at: Utc::now(),
                });
            }
            Err(e) => {
                error!(app = %app_name, error = %e, "undeploy failed");
                let _ = self.event_tx.send(DeployEvent::Failed {
                    app: app_name.to_string(),
                    phase: "uninstalling".to_string(),
                    error: e.to_string(),
                });
            }
        }

        result
    }

    /// Uninstall the application deployed from `archive`
    ///
    /// # Errors
    /// Returns `DeployError::InvalidArchiveName` or any error of `undeploy`
    pub async fn undeploy_archive(&self, archive: &dyn Archive) -> Result<(), DeployError> {
        let name = parse_archive_name(archive.name())?;
        self.undeploy(&name.app_name).await
    }

    /// Move `job` to `next`, logging and publishing the change
    fn transition(&self, job: &mut DeploymentJob, next: DeployPhase) -> Result<(), DeployError> {
        if !job.phase.can_transition_to(next) {
            return Err(DeployError::InvalidTransition {
                from: job.phase,
                to: next,
            });
        }

        let previous = job.phase;
        job.phase = next;

        info!(app = %job.app_name(), from = %previous, to = %next, "phase transition");

        let _ = self.event_tx.send(DeployEvent::PhaseChanged {
            app: job.app_name().to_string(),
            from: previous.to_string(),
            to: next.to_string(),
        });

        Ok(())
    }

    /// Move `job` to `Failed`, keeping the error context
    fn fail(&self, job: &mut DeploymentJob, error: &DeployError) {
        let previous = job.phase;
        job.failed = Some(FailedContext::new(previous, error.to_string()));
        job.phase = DeployPhase::Failed;

        error!(
            app = %job.app_name(),
            archive = %job.archive_name,
            phase = %previous,
            error = %error,
            "deployment failed"
        );

        let _ = self.event_tx.send(DeployEvent::Failed {
            app: job.app_name().to_string(),
            phase: previous.to_string(),
            error: error.to_string(),
        });
    }
}

fn parse_archive_name(display_name: &str) -> Result<ArchiveName, DeployError> {
    ArchiveName::parse(display_name)
        .ok_or_else(|| DeployError::InvalidArchiveName(display_name.to_string()))
}

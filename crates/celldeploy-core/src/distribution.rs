//! Distribution status aggregation and polling
//!
//! After install the application binaries propagate to every server in the
//! target scope. The endpoint reports cluster-wide progress as one composite
//! string per query, so completion is found by querying repeatedly until every
//! node votes `true`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use celldeploy_api::DeployEvent;
use celldeploy_mgmt::{ManagementClient, NotificationKind, ObjectName};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::DistributionPolicy;
use crate::error::DeployError;
use crate::gate::ManagementHandle;
use crate::rendezvous::{NotificationFilter, Rendezvous};

/// One node's distribution flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionVote {
    True,
    False,
    Unknown,
}

impl DistributionVote {
    /// Read a `distribution` key value; unrecognized values give `None`
    #[must_use]
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "true" => Some(DistributionVote::True),
            "false" => Some(DistributionVote::False),
            "unknown" => Some(DistributionVote::Unknown),
            _ => None,
        }
    }
}

/// Cluster-wide distribution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateState {
    Unknown,
    NotDone,
    Done,
}

impl fmt::Display for AggregateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateState::Unknown => "unknown",
            AggregateState::NotDone => "not_done",
            AggregateState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Parse a `+`-joined composite status into votes
///
/// # Errors
/// Returns `DeployError::MalformedStatus` if a token is not an object name or
/// lacks a `distribution` key
pub fn parse_composite(composite: &str) -> Result<Vec<DistributionVote>, DeployError> {
    let mut votes = Vec::new();

    for token in composite.split('+').map(str::trim).filter(|t| !t.is_empty()) {
        let name =
            ObjectName::parse(token).map_err(|e| DeployError::MalformedStatus(e.to_string()))?;
        let flag = name.key_property("distribution").ok_or_else(|| {
            DeployError::MalformedStatus(format!("{token} has no distribution key"))
        })?;

        match DistributionVote::from_flag(flag) {
            Some(vote) => votes.push(vote),
            None => warn!(token = %token, flag = %flag, "ignoring unrecognized distribution flag"),
        }
    }

    Ok(votes)
}

/// Combine votes: any unknown wins, then any false, then all true
///
/// # Errors
/// Returns `DeployError::IllegalAggregationState` for an empty vote set
pub fn aggregate(votes: &[DistributionVote]) -> Result<AggregateState, DeployError> {
    if votes.is_empty() {
        return Err(DeployError::IllegalAggregationState(
            "no distribution votes".to_string(),
        ));
    }
    if votes.contains(&DistributionVote::Unknown) {
        Ok(AggregateState::Unknown)
    } else if votes.contains(&DistributionVote::False) {
        Ok(AggregateState::NotDone)
    } else {
        Ok(AggregateState::Done)
    }
}

/// Parse and aggregate one composite status string
///
/// # Errors
/// See `parse_composite` and `aggregate`
pub fn evaluate(composite: &str) -> Result<AggregateState, DeployError> {
    let votes = parse_composite(composite)?;
    debug!(composite = %composite, votes = votes.len(), "distribution votes");
    aggregate(&votes).map_err(|_| {
        DeployError::IllegalAggregationState(format!("no distribution votes in {composite:?}"))
    })
}

/// Repeatedly queries distribution status until every node is done
pub struct DistributionPoller {
    /// Client issuing the status queries
    client: Arc<dyn ManagementClient>,
    /// Rendezvous the status notifications arrive on
    rendezvous: Arc<Rendezvous>,
    /// Query interval and attempt bound
    policy: DistributionPolicy,
    /// Bound on each status notification wait; `None` waits forever
    wait_limit: Option<Duration>,
    /// Channel for `DistributionProgress` events
    event_tx: Option<broadcast::Sender<DeployEvent>>,
}

impl DistributionPoller {
    pub fn new(handle: &ManagementHandle, policy: DistributionPolicy) -> Self {
        Self {
            client: Arc::clone(handle.client()),
            rendezvous: Arc::clone(handle.rendezvous()),
            policy,
            wait_limit: None,
            event_tx: None,
        }
    }

    /// Bound each status notification wait
    #[must_use]
    pub fn with_wait_limit(mut self, limit: Option<Duration>) -> Self {
        self.wait_limit = limit;
        self
    }

    /// Publish a `DistributionProgress` event per query
    #[must_use]
    pub fn with_events(mut self, event_tx: broadcast::Sender<DeployEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Issue one status query and aggregate the answer
    ///
    /// A status notification without a composite status counts as `Unknown`.
    ///
    /// # Errors
    /// Returns errors from the query, the wait, or aggregation
    pub async fn poll_once(&self, app_name: &str) -> Result<AggregateState, DeployError> {
        let subscription = self
            .rendezvous
            .subscribe(NotificationFilter::new(NotificationKind::DistributionStatusNode));

        let ((), delivered) = subscription
            .issue(
                self.client.request_distribution_status(app_name),
                self.wait_limit,
            )
            .await?;

        match delivered.composite_status() {
            Some(composite) => evaluate(composite),
            None => {
                debug!(app = %app_name, "status notification without composite status");
                Ok(AggregateState::Unknown)
            }
        }
    }

    /// Poll until `Done`, returning the attempt it was observed on
    ///
    /// # Errors
    /// Returns `DeployError::DistributionTimeout` once `max_attempts` queries
    /// passed without `Done`; any other error aborts immediately
    #[instrument(skip(self), fields(max_attempts = self.policy.max_attempts))]
    pub async fn run(&self, app_name: &str) -> Result<u32, DeployError> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            let state = self.poll_once(app_name).await?;
            debug!(app = %app_name, attempt, state = %state, "distribution status");

            if let Some(tx) = &self.event_tx {
                let _ = tx.send(DeployEvent::DistributionProgress {
                    app: app_name.to_string(),
                    attempt,
                    state: state.to_string(),
                });
            }

            if state == AggregateState::Done {
                info!(app = %app_name, attempt, "application distributed to all nodes");
                return Ok(attempt);
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.interval()).await;
            }
        }

        warn!(app = %app_name, attempts = max_attempts, "distribution did not complete");
        Err(DeployError::DistributionTimeout {
            attempts: max_attempts,
        })
    }
}

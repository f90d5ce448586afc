//! Notification rendezvous
//!
//! Hands a terminal management notification to the one task waiting for it.
//! A waiter subscribes before it issues the command that triggers the
//! notification; the delivery path resolves the first matching subscription
//! through a oneshot channel, so a notification that arrives before the
//! waiter reaches `wait` is kept until it does.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use celldeploy_mgmt::{
    APP_NOTIFICATION_TYPE, DeliveredNotification, MgmtError, Notification, NotificationKind,
    NotificationSink,
};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::DeployError;

/// Which notifications resolve a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationFilter {
    /// Required notification type
    pub notification_type: String,
    /// Required task kind
    pub kind: NotificationKind,
    /// Required correlation label; `None` accepts any
    pub correlation: Option<String>,
}

impl NotificationFilter {
    /// Match application management notifications of `kind`
    pub fn new(kind: NotificationKind) -> Self {
        Self {
            notification_type: APP_NOTIFICATION_TYPE.to_string(),
            kind,
            correlation: None,
        }
    }

    #[must_use]
    pub fn with_correlation(mut self, correlation: impl Into<String>) -> Self {
        self.correlation = Some(correlation.into());
        self
    }

    /// Whether `notification` is a terminal event this filter accepts
    #[must_use]
    pub fn matches(&self, notification: &Notification) -> bool {
        notification.status.is_terminal()
            && notification.notification_type == self.notification_type
            && notification.kind == self.kind
            && self
                .correlation
                .as_ref()
                .is_none_or(|c| notification.correlation.as_ref() == Some(c))
    }
}

struct Waiter {
    id: u64,
    filter: NotificationFilter,
    tx: oneshot::Sender<DeliveredNotification>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    waiters: Vec<Waiter>,
    closed: bool,
}

/// Registry of outstanding subscriptions for one management session
#[derive(Default)]
pub struct Rendezvous {
    registry: Mutex<Registry>,
}

impl Rendezvous {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register interest in the next notification matching `filter`
    pub fn subscribe(self: &Arc<Self>, filter: NotificationFilter) -> Subscription {
        let (tx, rx) = oneshot::channel();
        let mut registry = self.lock();

        let id = registry.next_id;
        registry.next_id += 1;

        if registry.closed {
            // tx dropped here, the wait fails with `RendezvousClosed`
            debug!(id, kind = %filter.kind, "subscribe on closed rendezvous");
        } else {
            debug!(id, kind = %filter.kind, correlation = ?filter.correlation, "subscribed");
            registry.waiters.push(Waiter {
                id,
                filter: filter.clone(),
                tx,
            });
        }

        Subscription {
            id,
            filter,
            rx,
            rendezvous: Arc::clone(self),
        }
    }

    /// Resolve the first subscription matching `notification`
    ///
    /// Returns whether a waiter was released. Non-terminal and unmatched
    /// notifications are dropped.
    pub fn dispatch(&self, notification: Notification) -> bool {
        let waiter = {
            let mut registry = self.lock();
            let Some(pos) = registry
                .waiters
                .iter()
                .position(|w| w.filter.matches(&notification))
            else {
                trace!(
                    kind = %notification.kind,
                    status = ?notification.status,
                    correlation = ?notification.correlation,
                    "notification without waiter"
                );
                return false;
            };
            registry.waiters.remove(pos)
        };

        debug!(id = waiter.id, kind = %notification.kind, status = ?notification.status, "notification matched");
        waiter.tx.send(notification.into()).is_ok()
    }

    /// Fail every pending and future wait
    pub fn close(&self) {
        let mut registry = self.lock();
        registry.closed = true;
        let dropped = registry.waiters.len();
        registry.waiters.clear();
        debug!(dropped, "rendezvous closed");
    }

    /// Whether `close` was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of unresolved subscriptions
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.lock().waiters.retain(|w| w.id != id);
    }
}

impl NotificationSink for Rendezvous {
    fn deliver(&self, notification: Notification) {
        self.dispatch(notification);
    }

    fn is_open(&self) -> bool {
        !self.is_closed()
    }
}

/// One registered wait for a notification
///
/// Dropping an unresolved subscription removes it from the registry.
pub struct Subscription {
    id: u64,
    filter: NotificationFilter,
    rx: oneshot::Receiver<DeliveredNotification>,
    rendezvous: Arc<Rendezvous>,
}

impl Subscription {
    #[must_use]
    pub fn filter(&self) -> &NotificationFilter {
        &self.filter
    }

    /// Wait for the matching notification, without a time limit
    ///
    /// # Errors
    /// Returns `DeployError::RendezvousClosed` if the rendezvous was closed
    pub async fn wait(self) -> Result<DeliveredNotification, DeployError> {
        self.wait_timeout(None).await
    }

    /// Wait for the matching notification, bounded by `limit` when set
    ///
    /// # Errors
    /// Returns `DeployError::NotificationTimeout` if `limit` elapses, or
    /// `DeployError::RendezvousClosed` if the rendezvous was closed
    pub async fn wait_timeout(
        mut self,
        limit: Option<Duration>,
    ) -> Result<DeliveredNotification, DeployError> {
        let received = match limit {
            Some(limit) => tokio::time::timeout(limit, &mut self.rx)
                .await
                .map_err(|_| DeployError::NotificationTimeout(limit))?,
            None => (&mut self.rx).await,
        };
        received.map_err(|_| DeployError::RendezvousClosed)
    }

    /// Issue `command` now that the subscription is registered, then wait
    ///
    /// # Errors
    /// Returns the command's error (the subscription is dropped) or any
    /// error from `wait_timeout`
    pub async fn issue<F, T>(
        self,
        command: F,
        limit: Option<Duration>,
    ) -> Result<(T, DeliveredNotification), DeployError>
    where
        F: Future<Output = Result<T, MgmtError>>,
    {
        let output = command.await?;
        let notification = self.wait_timeout(limit).await?;
        Ok((output, notification))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.rendezvous.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use celldeploy_mgmt::TaskStatus;

    fn install(status: TaskStatus, app: &str) -> Notification {
        Notification::new(NotificationKind::Install, status, format!("{app} {status:?}"))
            .with_correlation(NotificationKind::Install.correlation_for(app))
    }

    fn install_filter(app: &str) -> NotificationFilter {
        NotificationFilter::new(NotificationKind::Install)
            .with_correlation(NotificationKind::Install.correlation_for(app))
    }

    #[tokio::test]
    async fn test_delivery_before_wait_is_kept() {
        let rendezvous = Rendezvous::new();
        let sub = rendezvous.subscribe(install_filter("shop"));

        assert!(rendezvous.dispatch(install(TaskStatus::Completed, "shop")));
        assert_eq!(rendezvous.pending(), 0);

        let delivered = sub.wait().await.unwrap();
        assert!(delivered.success);
    }

    #[tokio::test]
    async fn test_delivery_from_another_thread() {
        let rendezvous = Rendezvous::new();
        let sub = rendezvous.subscribe(install_filter("shop"));

        let sink: Arc<dyn NotificationSink> = rendezvous.clone();
        let delivery = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            sink.deliver(install(TaskStatus::Failed, "shop"));
        });

        let delivered = sub.wait().await.unwrap();
        delivery.join().unwrap();

        assert!(!delivered.success);
        assert_eq!(delivered.message, "shop Failed");
    }

    #[tokio::test]
    async fn test_non_terminal_and_foreign_notifications_ignored() {
        let rendezvous = Rendezvous::new();
        let sub = rendezvous.subscribe(install_filter("shop"));

        assert!(!rendezvous.dispatch(install(TaskStatus::InProgress, "shop")));
        assert!(!rendezvous.dispatch(install(TaskStatus::Completed, "billing")));
        assert!(!rendezvous.dispatch(Notification::new(
            NotificationKind::Uninstall,
            TaskStatus::Completed,
            "",
        )));
        assert_eq!(rendezvous.pending(), 1);

        assert!(rendezvous.dispatch(install(TaskStatus::Completed, "shop")));
        assert!(sub.wait().await.unwrap().success);
    }

    #[tokio::test]
    async fn test_one_notification_releases_one_waiter() {
        let rendezvous = Rendezvous::new();
        let first = rendezvous.subscribe(NotificationFilter::new(
            NotificationKind::DistributionStatusNode,
        ));
        let second = rendezvous.subscribe(NotificationFilter::new(
            NotificationKind::DistributionStatusNode,
        ));

        let status = Notification::new(
            NotificationKind::DistributionStatusNode,
            TaskStatus::Completed,
            "",
        );
        assert!(rendezvous.dispatch(status));
        assert_eq!(rendezvous.pending(), 1);

        assert!(first.wait().await.is_ok());
        let still_waiting = second
            .wait_timeout(Some(Duration::from_millis(10)))
            .await;
        assert!(matches!(still_waiting, Err(DeployError::NotificationTimeout(_))));
    }

    #[tokio::test]
    async fn test_dropped_subscription_unregisters() {
        let rendezvous = Rendezvous::new();
        let sub = rendezvous.subscribe(install_filter("shop"));
        assert_eq!(rendezvous.pending(), 1);

        drop(sub);
        assert_eq!(rendezvous.pending(), 0);
        assert!(!rendezvous.dispatch(install(TaskStatus::Completed, "shop")));
    }

    #[tokio::test]
    async fn test_close_fails_waiters() {
        let rendezvous = Rendezvous::new();
        let pending = rendezvous.subscribe(install_filter("shop"));

        rendezvous.close();

        assert!(matches!(pending.wait().await, Err(DeployError::RendezvousClosed)));
        let late = rendezvous.subscribe(install_filter("shop"));
        assert!(matches!(late.wait().await, Err(DeployError::RendezvousClosed)));
    }

    #[tokio::test]
    async fn test_issue_failure_drops_subscription() {
        let rendezvous = Rendezvous::new();
        let sub = rendezvous.subscribe(install_filter("shop"));

        let result = sub
            .issue(
                async {
                    Err::<(), _>(MgmtError::CommandFailed {
                        command: "installApplication".to_string(),
                        message: "rejected".to_string(),
                    })
                },
                None,
            )
            .await;

        assert!(matches!(result, Err(DeployError::Management(_))));
        assert_eq!(rendezvous.pending(), 0);
    }

    #[tokio::test]
    async fn test_issue_runs_command_after_subscribing() {
        let rendezvous = Rendezvous::new();
        let sub = rendezvous.subscribe(install_filter("shop"));
        let sink = Arc::clone(&rendezvous);

        // The command completes the task before returning
        let (output, delivered) = sub
            .issue(
                async move {
                    sink.dispatch(install(TaskStatus::Completed, "shop"));
                    Ok::<_, MgmtError>("accepted")
                },
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap();

        assert_eq!(output, "accepted");
        assert!(delivered.success);
    }
}

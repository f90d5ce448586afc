//! Application management notifications

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Notification type emitted by the application management service
pub const APP_NOTIFICATION_TYPE: &str = "websphere.admin.appmgmt";

/// Property carrying the `+`-joined per-node distribution status
pub const COMPOSITE_STATUS_KEY: &str = "compositeStatus";

/// Management task a notification reports on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Install,
    Uninstall,
    DistributionStatusNode,
    Other(String),
}

impl NotificationKind {
    /// Correlation label used for a task on `app_name`
    ///
    /// Connectors tag notifications with this label so waiters for different
    /// applications never see each other's results.
    #[must_use]
    pub fn correlation_for(&self, app_name: &str) -> String {
        format!("{self} {app_name}")
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Install => f.write_str("Install"),
            NotificationKind::Uninstall => f.write_str("Uninstall"),
            NotificationKind::DistributionStatusNode => f.write_str("DistributionStatusNode"),
            NotificationKind::Other(name) => f.write_str(name),
        }
    }
}

/// Status of the reported task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Raw notification as received from the management endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Notification type
    pub notification_type: String,
    /// Task the notification reports on
    pub kind: NotificationKind,
    /// Task status
    pub status: TaskStatus,
    /// Human readable message
    pub message: String,
    /// Correlation label of the command that triggered the task
    pub correlation: Option<String>,
    /// Additional properties
    #[serde(default)]
    pub props: BTreeMap<String, String>,
}

impl Notification {
    /// Create an application management notification
    pub fn new(kind: NotificationKind, status: TaskStatus, message: impl Into<String>) -> Self {
        Self {
            notification_type: APP_NOTIFICATION_TYPE.to_string(),
            kind,
            status,
            message: message.into(),
            correlation: None,
            props: BTreeMap::new(),
        }
    }

    /// Set the correlation label
    #[must_use]
    pub fn with_correlation(mut self, correlation: impl Into<String>) -> Self {
        self.correlation = Some(correlation.into());
        self
    }

    /// Add a property
    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }
}

/// Terminal notification handed to a waiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredNotification {
    /// Task the notification reported on
    pub kind: NotificationKind,
    /// Whether the task completed rather than failed
    pub success: bool,
    /// Human readable message, the failure reason when unsuccessful
    pub message: String,
    /// Notification properties, including the composite status
    pub props: BTreeMap<String, String>,
}

impl DeliveredNotification {
    /// Composite distribution status, if the notification carries one
    #[must_use]
    pub fn composite_status(&self) -> Option<&str> {
        self.props.get(COMPOSITE_STATUS_KEY).map(String::as_str)
    }
}

impl From<Notification> for DeliveredNotification {
    fn from(n: Notification) -> Self {
        Self {
            kind: n.kind,
            success: n.status == TaskStatus::Completed,
            message: n.message,
            props: n.props,
        }
    }
}

//! Management transport traits

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::endpoint::Endpoint;
use crate::error::MgmtError;
use crate::notification::Notification;
use crate::object_name::ObjectName;

/// Receives every notification the management connection emits
///
/// Called from the transport's delivery path, which may run on any thread.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: Notification);

    /// Whether the sink still routes notifications; transports may stop
    /// delivering once this is false
    fn is_open(&self) -> bool {
        true
    }
}

/// Options for an application install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Module pattern to target server mapping
    pub module_targets: BTreeMap<String, String>,
    /// Virtual host for default bindings
    pub default_virtual_host: String,
    /// Upload the archive to the endpoint instead of reading it server side
    pub upload_archive: bool,
    /// Correlation label notifications for this install carry
    pub correlation: String,
}

impl InstallOptions {
    /// Map every module of the application to `target`
    pub fn for_target(target: impl Into<String>, correlation: impl Into<String>) -> Self {
        let mut module_targets = BTreeMap::new();
        module_targets.insert("*".to_string(), target.into());
        Self {
            module_targets,
            default_virtual_host: "default_host".to_string(),
            upload_archive: true,
            correlation: correlation.into(),
        }
    }
}

/// Application management operations on a connected endpoint
///
/// Install, uninstall and the distribution query return once the endpoint
/// accepted the command; their outcome arrives later as a notification.
#[async_trait]
pub trait ManagementClient: Send + Sync {
    /// Object name of the server process this connection talks to
    async fn server_object_name(&self) -> Result<ObjectName, MgmtError>;

    async fn install_application(
        &self,
        archive: &Path,
        app_name: &str,
        options: &InstallOptions,
    ) -> Result<(), MgmtError>;

    async fn uninstall_application(&self, app_name: &str, correlation: &str)
    -> Result<(), MgmtError>;

    async fn request_distribution_status(&self, app_name: &str) -> Result<(), MgmtError>;

    /// Start the application, returning the targets it started on
    async fn start_application(&self, app_name: &str) -> Result<String, MgmtError>;

    fn client_type(&self) -> &'static str;
}

/// Opens management connections
#[async_trait]
pub trait ManagementConnector: Send + Sync {
    /// Connect to `endpoint`, routing every notification into `sink`
    async fn connect(
        &self,
        endpoint: &Endpoint,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Arc<dyn ManagementClient>, MgmtError>;
}

//! Mock management cell and archive collaborators shared by integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use celldeploy_core::{
    Archive, ConnectionGate, DeploySettings, DescriptorValidator, DistributionPolicy,
    ManagementHandle,
};
use celldeploy_mgmt::{
    COMPOSITE_STATUS_KEY, Endpoint, InstallOptions, ManagementClient, ManagementConnector,
    MgmtError, Notification, NotificationKind, NotificationSink, ObjectName, TaskStatus,
};

pub const SERVER_NAME: &str =
    "WebSphere:name=server1,process=server1,cell=cell01,node=node01,processType=UnManagedProcess";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Composite status with one token per flag
pub fn composite(flags: &[&str]) -> String {
    flags
        .iter()
        .enumerate()
        .map(|(i, f)| format!("WebSphere:cell=cell01,node=node{i},distribution={f}"))
        .collect::<Vec<_>>()
        .join("+")
}

/// Scripted management endpoint
///
/// Commands emit their completion notification into the session's sink,
/// either before returning or after `delay` from a spawned task.
pub struct MockCell {
    pub server_name: String,
    /// Install outcome; `None` never sends a terminal notification
    pub install: Option<(TaskStatus, String)>,
    pub uninstall: Option<(TaskStatus, String)>,
    /// Composite statuses returned in order, the last one repeats;
    /// `None` sends a notification without a composite property
    pub distribution: Mutex<VecDeque<Option<String>>>,
    pub start: Result<String, MgmtError>,
    pub delay: Option<Duration>,
    pub refuse_connection: bool,
    sink: Mutex<Option<Arc<dyn NotificationSink>>>,
    /// Archive path passed to install and whether it existed at that point
    pub installed: Mutex<Vec<(PathBuf, bool)>>,
    pub install_options: Mutex<Option<InstallOptions>>,
    /// Install and start commands in arrival order, e.g. `install shop`
    pub operations: Mutex<Vec<String>>,
    pub distribution_queries: AtomicU32,
    pub starts: AtomicU32,
    pub uninstalls: AtomicU32,
}

impl MockCell {
    pub fn new() -> Self {
        Self {
            server_name: SERVER_NAME.to_string(),
            install: Some((TaskStatus::Completed, "installed".to_string())),
            uninstall: Some((TaskStatus::Completed, "uninstalled".to_string())),
            distribution: Mutex::new(VecDeque::from([Some(composite(&["true", "true"]))])),
            start: Ok("WebSphere:cell=cell01,node=node01,server=server1".to_string()),
            delay: None,
            refuse_connection: false,
            sink: Mutex::new(None),
            installed: Mutex::new(Vec::new()),
            install_options: Mutex::new(None),
            operations: Mutex::new(Vec::new()),
            distribution_queries: AtomicU32::new(0),
            starts: AtomicU32::new(0),
            uninstalls: AtomicU32::new(0),
        }
    }

    pub fn with_process_type(mut self, process_type: &str) -> Self {
        self.server_name = format!(
            "WebSphere:name=dmgr,process=dmgr,cell=cell01,node=node01,processType={process_type}"
        );
        self
    }

    pub fn with_install(mut self, status: TaskStatus, message: &str) -> Self {
        self.install = Some((status, message.to_string()));
        self
    }

    pub fn with_silent_install(mut self) -> Self {
        self.install = None;
        self
    }

    pub fn with_uninstall(mut self, status: TaskStatus, message: &str) -> Self {
        self.uninstall = Some((status, message.to_string()));
        self
    }

    pub fn with_distribution(self, script: Vec<Option<String>>) -> Self {
        *self.distribution.lock().unwrap() = script.into();
        self
    }

    pub fn with_start_error(mut self, message: &str) -> Self {
        self.start = Err(MgmtError::CommandFailed {
            command: "startApplication".to_string(),
            message: message.to_string(),
        });
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connection = true;
        self
    }

    pub fn queries(&self) -> u32 {
        self.distribution_queries.load(Ordering::SeqCst)
    }

    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }

    /// Sink the gate handed to the connector, if it got that far
    pub fn sink(&self) -> Option<Arc<dyn NotificationSink>> {
        self.sink.lock().unwrap().clone()
    }

    fn emit(&self, notification: Notification) {
        let Some(sink) = self.sink.lock().unwrap().clone() else {
            return;
        };
        match self.delay {
            Some(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    sink.deliver(notification);
                });
            }
            None => sink.deliver(notification),
        }
    }

    fn next_composite(&self) -> Option<String> {
        let mut script = self.distribution.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().cloned().flatten()
        }
    }
}

#[async_trait]
impl ManagementClient for MockCell {
    async fn server_object_name(&self) -> Result<ObjectName, MgmtError> {
        ObjectName::parse(&self.server_name)
    }

    async fn install_application(
        &self,
        archive: &Path,
        app_name: &str,
        options: &InstallOptions,
    ) -> Result<(), MgmtError> {
        self.operations
            .lock()
            .unwrap()
            .push(format!("install {app_name}"));
        self.installed
            .lock()
            .unwrap()
            .push((archive.to_path_buf(), archive.exists()));
        *self.install_options.lock().unwrap() = Some(options.clone());

        // Progress notifications never resolve a waiter
        self.emit(
            Notification::new(NotificationKind::Install, TaskStatus::InProgress, "uploading")
                .with_correlation(&options.correlation),
        );
        if let Some((status, message)) = &self.install {
            self.emit(
                Notification::new(NotificationKind::Install, *status, message)
                    .with_correlation(&options.correlation),
            );
        }
        Ok(())
    }

    async fn uninstall_application(
        &self,
        _app_name: &str,
        correlation: &str,
    ) -> Result<(), MgmtError> {
        self.uninstalls.fetch_add(1, Ordering::SeqCst);
        if let Some((status, message)) = &self.uninstall {
            self.emit(
                Notification::new(NotificationKind::Uninstall, *status, message)
                    .with_correlation(correlation),
            );
        }
        Ok(())
    }

    async fn request_distribution_status(&self, _app_name: &str) -> Result<(), MgmtError> {
        self.distribution_queries.fetch_add(1, Ordering::SeqCst);
        let mut notification = Notification::new(
            NotificationKind::DistributionStatusNode,
            TaskStatus::Completed,
            "distribution status",
        );
        if let Some(composite) = self.next_composite() {
            notification = notification.with_prop(COMPOSITE_STATUS_KEY, composite);
        }
        self.emit(notification);
        Ok(())
    }

    async fn start_application(&self, app_name: &str) -> Result<String, MgmtError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.operations
            .lock()
            .unwrap()
            .push(format!("start {app_name}"));
        self.start.clone()
    }

    fn client_type(&self) -> &'static str {
        "mock"
    }
}

pub struct MockConnector {
    pub cell: Arc<MockCell>,
}

#[async_trait]
impl ManagementConnector for MockConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Arc<dyn ManagementClient>, MgmtError> {
        if self.cell.refuse_connection {
            return Err(MgmtError::ConnectionFailed(format!(
                "{}:{} refused",
                endpoint.host, endpoint.port
            )));
        }
        *self.cell.sink.lock().unwrap() = Some(sink);
        Ok(self.cell.clone())
    }
}

/// Open a gated session on `cell`
pub async fn session(cell: MockCell) -> (Arc<MockCell>, ManagementHandle) {
    init_tracing();
    let cell = Arc::new(cell);
    let connector = MockConnector { cell: cell.clone() };
    let handle = ConnectionGate::open(&connector, &Endpoint::new("was.local", "admin"))
        .await
        .unwrap();
    (cell, handle)
}

pub fn fast_settings(max_attempts: u32) -> DeploySettings {
    DeploySettings {
        http_host: "was.local".to_string(),
        http_port: 9080,
        distribution: DistributionPolicy {
            interval_ms: 1,
            max_attempts,
        },
        notification_timeout: None,
        event_channel_capacity: 64,
    }
}

/// Archive that records where it was exported
pub struct TrackingArchive {
    name: String,
    pub exported_to: Mutex<Option<PathBuf>>,
}

impl TrackingArchive {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exported_to: Mutex::new(None),
        }
    }

    pub fn exported_path(&self) -> PathBuf {
        self.exported_to
            .lock()
            .unwrap()
            .clone()
            .expect("archive was never exported")
    }
}

impl Archive for TrackingArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn export_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, b"PK\x03\x04 test archive")?;
        *self.exported_to.lock().unwrap() = Some(path.to_path_buf());
        Ok(())
    }
}

/// Validator returning fixed diagnostics
pub struct FixedValidator(pub Vec<String>);

#[async_trait]
impl DescriptorValidator for FixedValidator {
    async fn validate(&self, archive: &Path) -> Vec<String> {
        assert!(archive.exists(), "validator must see the exported archive");
        self.0.clone()
    }
}

//! celldeploy-mgmt: Management endpoint abstraction
//!
//! Connection properties, management object names, the application
//! notification model and the traits a management transport implements.

pub mod endpoint;
pub mod error;
pub mod notification;
pub mod object_name;
pub mod traits;

pub use endpoint::{ConnectorType, Endpoint, TlsMaterial};
pub use error::MgmtError;
pub use notification::{
    APP_NOTIFICATION_TYPE, COMPOSITE_STATUS_KEY, DeliveredNotification, Notification,
    NotificationKind, TaskStatus,
};
pub use object_name::ObjectName;
pub use traits::{InstallOptions, ManagementClient, ManagementConnector, NotificationSink};

//! Connection gate: only application-hosting server processes are deploy targets

use std::fmt;
use std::sync::Arc;

use celldeploy_mgmt::{Endpoint, ManagementClient, ManagementConnector, NotificationSink, ObjectName};
use tracing::{debug, info, instrument, warn};

use crate::error::DeployError;
use crate::rendezvous::Rendezvous;

/// Process types that coordinate a cell but host no applications
pub const DISALLOWED_PROCESS_TYPES: [&str; 3] = ["DeploymentManager", "NodeAgent", "ManagedProcess"];

/// Cell/node/server triple of the target server process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    /// Cell name
    pub cell: String,
    /// Node name
    pub node: String,
    /// Server process name
    pub process: String,
}

impl ServerIdentity {
    /// Read the identity from a server object name
    ///
    /// # Errors
    /// Returns `DeployError::Connection` if a key property is missing
    pub fn from_object_name(name: &ObjectName) -> Result<Self, DeployError> {
        let key = |k: &str| {
            name.key_property(k).map(str::to_string).ok_or_else(|| {
                DeployError::Connection(format!("server object name {name} has no {k} key"))
            })
        };

        Ok(Self {
            cell: key("cell")?,
            node: key("node")?,
            process: key("process")?,
        })
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WebSphere:cell={},node={},server={}",
            self.cell, self.node, self.process
        )
    }
}

/// An established, validated management session
///
/// Clones share the same client and rendezvous.
#[derive(Clone)]
pub struct ManagementHandle {
    /// Connected management client
    client: Arc<dyn ManagementClient>,
    /// Rendezvous receiving the connection's notifications
    rendezvous: Arc<Rendezvous>,
    /// Server the connection talks to
    identity: ServerIdentity,
    /// `processType` key of the server object name
    process_type: String,
}

impl fmt::Debug for ManagementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagementHandle")
            .field("client", &self.client.client_type())
            .field("identity", &self.identity)
            .field("process_type", &self.process_type)
            .field("pending", &self.rendezvous.pending())
            .finish()
    }
}

impl ManagementHandle {
    #[must_use]
    pub fn client(&self) -> &Arc<dyn ManagementClient> {
        &self.client
    }

    #[must_use]
    pub fn rendezvous(&self) -> &Arc<Rendezvous> {
        &self.rendezvous
    }

    #[must_use]
    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    #[must_use]
    pub fn process_type(&self) -> &str {
        &self.process_type
    }

    /// Stop routing notifications to waiters; pending waits fail
    pub fn close(&self) {
        self.rendezvous.close();
    }
}

/// Opens and validates management sessions
pub struct ConnectionGate;

impl ConnectionGate {
    /// Connect to `endpoint` and check it is a deployable server process
    ///
    /// # Errors
    /// Returns `DeployError::Connection` if the connection fails, the server
    /// object name is incomplete, or the process is a management-tier process
    #[instrument(skip_all, fields(host = %endpoint.host, port = endpoint.port))]
    pub async fn open(
        connector: &dyn ManagementConnector,
        endpoint: &Endpoint,
    ) -> Result<ManagementHandle, DeployError> {
        let rendezvous = Rendezvous::new();
        let sink: Arc<dyn NotificationSink> = rendezvous.clone();

        let client = match connector.connect(endpoint, sink).await {
            Ok(client) => client,
            Err(e) => {
                rendezvous.close();
                return Err(DeployError::Connection(format!(
                    "could not create management client: {e}"
                )));
            }
        };

        let server = match client.server_object_name().await {
            Ok(server) => server,
            Err(e) => {
                rendezvous.close();
                return Err(DeployError::Connection(format!(
                    "could not resolve server: {e}"
                )));
            }
        };

        debug!(keys = %server.canonical_key_property_list(), "server object name");

        let Some(process_type) = server.key_property("processType").map(str::to_string) else {
            rendezvous.close();
            return Err(DeployError::Connection(format!(
                "server object name {server} has no processType key"
            )));
        };

        if DISALLOWED_PROCESS_TYPES.contains(&process_type.as_str()) {
            warn!(process_type = %process_type, "refusing management-tier process");
            rendezvous.close();
            return Err(DeployError::Connection(format!(
                "connecting to a {process_type} is not supported"
            )));
        }

        let identity = match ServerIdentity::from_object_name(&server) {
            Ok(identity) => identity,
            Err(e) => {
                rendezvous.close();
                return Err(e);
            }
        };

        info!(
            server = %identity,
            process_type = %process_type,
            client = client.client_type(),
            "connected to management endpoint"
        );

        Ok(ManagementHandle {
            client,
            rendezvous,
            identity,
            process_type,
        })
    }
}

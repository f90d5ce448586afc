//! Container configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use celldeploy_mgmt::{Endpoint, TlsMaterial};
use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Configuration for one remote application-server container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Host of the application server
    #[serde(default = "default_address")]
    pub remote_server_address: String,
    /// SOAP management port
    #[serde(default = "default_soap_port")]
    pub remote_server_soap_port: u16,
    /// HTTP port test clients connect to
    #[serde(default = "default_http_port")]
    pub remote_server_http_port: u16,
    /// Management user
    #[serde(default = "default_username")]
    pub username: String,
    /// Management password, sent only when security is enabled
    pub password: Option<String>,
    /// Use authenticated TLS connections
    #[serde(default)]
    pub security_enabled: bool,
    /// Trust store path
    pub ssl_trust_store: Option<String>,
    /// Trust store password
    pub ssl_trust_store_password: Option<String>,
    /// Key store path
    pub ssl_key_store: Option<String>,
    /// Key store password
    pub ssl_key_store_password: Option<String>,
    /// Upper bound on install/uninstall notification waits (unbounded when unset)
    pub notification_timeout_secs: Option<u64>,
    /// Distribution status polling bounds
    #[serde(default)]
    pub distribution: DistributionPolicy,
}

fn default_address() -> String {
    "localhost".to_string()
}

fn default_soap_port() -> u16 {
    8880
}

fn default_http_port() -> u16 {
    9080
}

fn default_username() -> String {
    "admin".to_string()
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            remote_server_address: default_address(),
            remote_server_soap_port: default_soap_port(),
            remote_server_http_port: default_http_port(),
            username: default_username(),
            password: None,
            security_enabled: false,
            ssl_trust_store: None,
            ssl_trust_store_password: None,
            ssl_key_store: None,
            ssl_key_store_password: None,
            notification_timeout_secs: None,
            distribution: DistributionPolicy::default(),
        }
    }
}

/// Distribution polling bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionPolicy {
    /// Delay between status queries
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Maximum number of status queries
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    300
}

impl Default for DistributionPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl DistributionPolicy {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ContainerConfig {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns `DeployError::Config` if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DeployError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    /// Returns `DeployError::Config` if the document is invalid
    pub fn from_toml(content: &str) -> Result<Self, DeployError> {
        toml::from_str(content).map_err(|e| DeployError::Config(e.to_string()))
    }

    /// Load from default paths or use defaults
    ///
    /// # Errors
    /// Returns `DeployError::Config` if a config file exists but cannot be loaded
    pub fn load_default() -> Result<Self, DeployError> {
        if let Ok(path) = std::env::var("CELLDEPLOY_CONFIG") {
            return Self::load(Path::new(&path));
        }

        let paths = [
            PathBuf::from("celldeploy.toml"),
            PathBuf::from("/etc/celldeploy/celldeploy.toml"),
            dirs::config_dir()
                .map(|p| p.join("celldeploy/celldeploy.toml"))
                .unwrap_or_default(),
        ];

        for path in paths {
            if path.is_file() {
                return Self::load(&path);
            }
        }

        tracing::warn!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    /// Returns `DeployError::Config` describing the first problem found
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.remote_server_address.trim().is_empty() {
            return Err(DeployError::Config(
                "remote_server_address must not be empty".to_string(),
            ));
        }
        if self.distribution.max_attempts == 0 {
            return Err(DeployError::Config(
                "distribution.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.security_enabled {
            let missing: Vec<&str> = [
                ("password", self.password.is_none()),
                ("ssl_trust_store", self.ssl_trust_store.is_none()),
                ("ssl_key_store", self.ssl_key_store.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            if !missing.is_empty() {
                return Err(DeployError::Config(format!(
                    "security_enabled requires {}",
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Management endpoint described by this configuration
    ///
    /// # Errors
    /// Returns `DeployError::Config` if the configuration is invalid
    pub fn endpoint(&self) -> Result<Endpoint, DeployError> {
        self.validate()?;

        let endpoint = Endpoint::new(&self.remote_server_address, &self.username)
            .with_port(self.remote_server_soap_port);

        if !self.security_enabled {
            return Ok(endpoint);
        }

        let tls = TlsMaterial {
            trust_store: self.ssl_trust_store.clone().unwrap_or_default(),
            trust_store_password: self.ssl_trust_store_password.clone().unwrap_or_default(),
            key_store: self.ssl_key_store.clone().unwrap_or_default(),
            key_store_password: self.ssl_key_store_password.clone().unwrap_or_default(),
        };
        Ok(endpoint.with_security(self.password.clone().unwrap_or_default(), tls))
    }

    /// Install/uninstall notification timeout, if configured
    #[must_use]
    pub fn notification_timeout(&self) -> Option<Duration> {
        self.notification_timeout_secs.map(Duration::from_secs)
    }
}

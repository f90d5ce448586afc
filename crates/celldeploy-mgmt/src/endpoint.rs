//! Management endpoint connection details

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire connector used to reach the management endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectorType {
    #[default]
    Soap,
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorType::Soap => f.write_str("SOAP"),
        }
    }
}

/// Trust and key stores used when security is enabled
#[derive(Clone, Serialize, Deserialize)]
pub struct TlsMaterial {
    /// Trust store path
    pub trust_store: String,
    /// Trust store password
    pub trust_store_password: String,
    /// Key store path
    pub key_store: String,
    /// Key store password
    pub key_store_password: String,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("trust_store", &self.trust_store)
            .field("key_store", &self.key_store)
            .finish_non_exhaustive()
    }
}

/// Connection information for a management endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host address
    pub host: String,
    /// Management (SOAP) port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connector type
    #[serde(default)]
    pub connector: ConnectorType,
    /// Username
    pub username: String,
    /// Password, only sent when security is enabled
    pub password: Option<String>,
    /// Whether the endpoint requires authentication and TLS
    #[serde(default)]
    pub security_enabled: bool,
    /// TLS stores, required when security is enabled
    pub tls: Option<TlsMaterial>,
}

fn default_port() -> u16 {
    8880
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connector", &self.connector)
            .field("username", &self.username)
            .field("security_enabled", &self.security_enabled)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    /// Create new endpoint info with security disabled
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            connector: ConnectorType::Soap,
            username: username.into(),
            password: None,
            security_enabled: false,
            tls: None,
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable security with a password and TLS stores
    #[must_use]
    pub fn with_security(mut self, password: impl Into<String>, tls: TlsMaterial) -> Self {
        self.security_enabled = true;
        self.password = Some(password.into());
        self.tls = Some(tls);
        self
    }

    /// Properties handed to the management connector
    #[must_use]
    pub fn connection_properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert("host".to_string(), self.host.clone());
        props.insert("port".to_string(), self.port.to_string());
        props.insert("type".to_string(), self.connector.to_string());
        props.insert("username".to_string(), self.username.clone());
        props.insert(
            "securityEnabled".to_string(),
            self.security_enabled.to_string(),
        );

        if self.security_enabled {
            if let Some(password) = &self.password {
                props.insert("password".to_string(), password.clone());
            }
            props.insert("cacheDisabled".to_string(), "false".to_string());
            if let Some(tls) = &self.tls {
                props.insert("javax.net.ssl.trustStore".to_string(), tls.trust_store.clone());
                props.insert("javax.net.ssl.keyStore".to_string(), tls.key_store.clone());
                props.insert(
                    "javax.net.ssl.trustStorePassword".to_string(),
                    tls.trust_store_password.clone(),
                );
                props.insert(
                    "javax.net.ssl.keyStorePassword".to_string(),
                    tls.key_store_password.clone(),
                );
            }
        }

        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tls() -> TlsMaterial {
        TlsMaterial {
            trust_store: "/opt/was/etc/trust.p12".to_string(),
            trust_store_password: "trustpw".to_string(),
            key_store: "/opt/was/etc/key.p12".to_string(),
            key_store_password: "keypw".to_string(),
        }
    }

    #[test]
    fn test_insecure_properties() {
        let props = Endpoint::new("was.local", "admin").connection_properties();

        assert_eq!(props["host"], "was.local");
        assert_eq!(props["port"], "8880");
        assert_eq!(props["type"], "SOAP");
        assert_eq!(props["username"], "admin");
        assert_eq!(props["securityEnabled"], "false");
        assert!(!props.contains_key("password"));
        assert!(!props.contains_key("javax.net.ssl.trustStore"));
    }

    #[test]
    fn test_secure_properties() {
        let props = Endpoint::new("was.local", "admin")
            .with_port(8879)
            .with_security("secret", tls())
            .connection_properties();

        assert_eq!(props["port"], "8879");
        assert_eq!(props["securityEnabled"], "true");
        assert_eq!(props["password"], "secret");
        assert_eq!(props["cacheDisabled"], "false");
        assert_eq!(props["javax.net.ssl.trustStore"], "/opt/was/etc/trust.p12");
        assert_eq!(props["javax.net.ssl.keyStore"], "/opt/was/etc/key.p12");
        assert_eq!(props["javax.net.ssl.trustStorePassword"], "trustpw");
        assert_eq!(props["javax.net.ssl.keyStorePassword"], "keypw");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let endpoint = Endpoint::new("was.local", "admin").with_security("secret", tls());
        let rendered = format!("{endpoint:?}");

        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("keypw"));
    }
}

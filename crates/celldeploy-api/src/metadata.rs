//! Discovery metadata returned by a successful deployment

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the servlet that runs tests inside the deployed application
pub const ARQUILLIAN_SERVLET_NAME: &str = "ArquillianServletRunner";

/// Label the test servlet is bound under
pub const PROTOCOL_LABEL: &str = "arquillian-protocol";

/// Remote execution protocol expected by callers
pub const DEFAULT_PROTOCOL: &str = "Servlet 2.5";

/// Remote execution protocol description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolDescription {
    pub name: String,
}

impl ProtocolDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ProtocolDescription {
    fn default() -> Self {
        Self::new(DEFAULT_PROTOCOL)
    }
}

impl fmt::Display for ProtocolDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A servlet reachable inside an HTTP context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Servlet {
    /// Servlet name
    pub name: String,
    /// Context root the servlet is bound under
    pub context_root: String,
}

impl Servlet {
    pub fn new(name: impl Into<String>, context_root: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context_root: context_root.into(),
        }
    }
}

/// Host and port a test client connects to, plus the servlets it exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpContext {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub servlets: Vec<Servlet>,
}

impl HttpContext {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            servlets: Vec::new(),
        }
    }

    /// Add a servlet to this context
    #[must_use]
    pub fn with_servlet(mut self, servlet: Servlet) -> Self {
        self.servlets.push(servlet);
        self
    }

    /// Look up a servlet by name
    #[must_use]
    pub fn servlet(&self, name: &str) -> Option<&Servlet> {
        self.servlets.iter().find(|s| s.name == name)
    }
}

/// Everything a test client needs to reach a deployed application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMetadata {
    #[serde(default)]
    pub contexts: Vec<HttpContext>,
}

impl ProtocolMetadata {
    /// Metadata for the test-runner servlet on `host:port`
    #[must_use]
    pub fn for_servlet_runner(host: impl Into<String>, port: u16) -> Self {
        let context = HttpContext::new(host, port)
            .with_servlet(Servlet::new(ARQUILLIAN_SERVLET_NAME, PROTOCOL_LABEL));
        Self {
            contexts: vec![context],
        }
    }

    /// Add an HTTP context
    pub fn add_context(&mut self, context: HttpContext) {
        self.contexts.push(context);
    }
}

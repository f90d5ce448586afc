//! Management object names (`domain:key=value,key=value`)

use std::fmt;
use std::str::FromStr;

use crate::error::MgmtError;

/// Parsed management object name
///
/// Key properties keep the order they were written in; lookups are by exact key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    domain: String,
    properties: Vec<(String, String)>,
}

impl ObjectName {
    /// Parse an object name
    ///
    /// # Errors
    /// Returns `MgmtError::MalformedObjectName` if the domain separator is
    /// missing, the domain is empty, or a key property is malformed or repeated
    pub fn parse(raw: &str) -> Result<Self, MgmtError> {
        let malformed = |reason: &str| MgmtError::MalformedObjectName {
            name: raw.to_string(),
            reason: reason.to_string(),
        };

        let (domain, keys) = raw
            .split_once(':')
            .ok_or_else(|| malformed("missing domain separator"))?;
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(malformed("empty domain"));
        }

        let mut properties: Vec<(String, String)> = Vec::new();
        for pair in keys.split(',') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| malformed("key property without '='"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed("empty key"));
            }
            if properties.iter().any(|(k, _)| k == key) {
                return Err(malformed("duplicate key"));
            }
            properties.push((key.to_string(), value.trim().to_string()));
        }

        Ok(Self {
            domain: domain.to_string(),
            properties,
        })
    }

    /// Object name domain
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Value of a key property
    #[must_use]
    pub fn key_property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Key properties sorted by key, comma separated
    #[must_use]
    pub fn canonical_key_property_list(&self) -> String {
        let mut sorted: Vec<_> = self.properties.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for ObjectName {
    type Err = MgmtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (i, (k, v)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

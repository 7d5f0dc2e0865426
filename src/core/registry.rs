use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Transport scheme used to reach a backend service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceScheme {
    Http,
    Https,
}

impl ServiceScheme {
    /// Scheme string as it appears in a URI
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceScheme::Http => "http",
            ServiceScheme::Https => "https",
        }
    }

    /// Default port used when the target does not declare one
    pub fn default_port(&self) -> u16 {
        match self {
            ServiceScheme::Http => 80,
            ServiceScheme::Https => 443,
        }
    }
}

impl Default for ServiceScheme {
    fn default() -> Self {
        Self::Http
    }
}

/// Network target of a registered backend service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTarget {
    /// Service name, matched against the first path segment
    pub name: String,

    /// Backend host
    pub host: String,

    /// Backend port (scheme default when absent)
    pub port: Option<u16>,

    /// Transport scheme
    #[serde(default)]
    pub scheme: ServiceScheme,
}

impl ServiceTarget {
    /// Create a new service target
    pub fn new(name: impl Into<String>, host: impl Into<String>, scheme: ServiceScheme) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: None,
            scheme,
        }
    }

    /// Set an explicit port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// The host:port authority for the outbound URI
    pub fn authority(&self) -> String {
        format!(
            "{}:{}",
            self.host,
            self.port.unwrap_or_else(|| self.scheme.default_port())
        )
    }
}

/// Immutable mapping from service name to backend target.
///
/// Built once at startup from configuration and shared read-only across
/// requests. Names are stored lowercase and matched case-insensitively.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    targets: HashMap<String, ServiceTarget>,
}

impl ServiceRegistry {
    /// Build a registry from the configured targets, validating exhaustively
    pub fn new(targets: Vec<ServiceTarget>) -> Result<Self, ConfigError> {
        let mut map = HashMap::with_capacity(targets.len());

        for mut target in targets {
            target.name = target.name.to_lowercase();

            if target.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "service name must not be empty".to_string(),
                ));
            }
            if target.name.contains('/') {
                return Err(ConfigError::ValidationError(format!(
                    "service name '{}' must be a single path segment",
                    target.name
                )));
            }
            if target.host.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "service '{}' has no host configured",
                    target.name
                )));
            }
            if map.contains_key(&target.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate service name '{}'",
                    target.name
                )));
            }

            map.insert(target.name.clone(), target);
        }

        Ok(Self { targets: map })
    }

    /// Resolve a registered service by its lowercase name
    pub fn resolve(&self, name: &str) -> Option<&ServiceTarget> {
        self.targets.get(name)
    }

    /// Extract the first path segment and test it against the registry.
    ///
    /// Returns the registered (lowercase) service name on a match. Paths
    /// without a leading slash never match. A path consisting of the segment
    /// alone (`/catalog`) matches on that segment.
    pub fn service_for_path(&self, path: &str) -> Option<&str> {
        let rest = path.strip_prefix('/')?;
        let segment = match rest.find('/') {
            Some(idx) => &rest[..idx],
            None => rest,
        };

        if segment.is_empty() {
            return None;
        }

        let name = segment.to_lowercase();
        self.targets.get(&name).map(|target| target.name.as_str())
    }

    /// Number of registered services
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

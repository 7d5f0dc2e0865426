use std::sync::Arc;

use hyper::Method;
use regex::Regex;

use crate::error::ConfigError;

/// A single authorization rule declared on a local route.
///
/// The request identity must hold at least one of `roles` (when any are
/// listed) and satisfy `policy` (when one is named).
#[derive(Debug, Clone, Default)]
pub struct AuthorizeRule {
    /// Accepted roles (any-of); empty means no role restriction
    pub roles: Vec<String>,

    /// Named policy that must evaluate to success
    pub policy: Option<String>,
}

impl AuthorizeRule {
    /// Rule with no role or policy restriction
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given roles
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Require a named policy
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }
}

/// Authorization metadata declared on a local route.
///
/// Read-only for the process lifetime; the dispatch pipeline queries it once
/// per request after route matching.
#[derive(Debug, Clone, Default)]
pub struct EndpointMetadata {
    /// Skip the gateway entirely and run the local handler
    pub override_gateway: bool,

    /// Forward without requiring an identity
    pub allow_anonymous: bool,

    /// Declared authorization rules, evaluated in order
    pub rules: Vec<AuthorizeRule>,
}

impl EndpointMetadata {
    /// Route handled locally instead of being forwarded
    pub fn local_override() -> Self {
        Self {
            override_gateway: true,
            ..Self::default()
        }
    }

    /// Route forwarded without authentication
    pub fn anonymous() -> Self {
        Self {
            allow_anonymous: true,
            ..Self::default()
        }
    }

    /// Route forwarded for any authenticated identity
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Route forwarded when every rule passes
    pub fn with_rules(rules: Vec<AuthorizeRule>) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }
}

/// Compiled path pattern for endpoint matching.
///
/// Literal segments match exactly; `:name` segments match any single
/// segment.
#[derive(Debug, Clone)]
struct RoutePattern {
    pattern: String,
    regex: Regex,
}

impl RoutePattern {
    fn new(path: &str) -> Result<Self, ConfigError> {
        if !path.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "route pattern '{}' must start with '/'",
                path
            )));
        }

        let mut regex_pattern = "^".to_string();

        for (i, part) in path.split('/').enumerate() {
            if i > 0 {
                regex_pattern.push('/');
            }

            if part.is_empty() {
                continue;
            }

            if part.starts_with(':') {
                regex_pattern.push_str(r"([^/]+)");
            } else {
                regex_pattern.push_str(&regex::escape(part));
            }
        }

        regex_pattern.push('$');

        let regex = Regex::new(&regex_pattern).map_err(|e| {
            ConfigError::ValidationError(format!("invalid route pattern '{}': {}", path, e))
        })?;

        Ok(Self {
            pattern: path.to_string(),
            regex,
        })
    }

    fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// One declared route with its metadata
#[derive(Debug, Clone)]
struct EndpointEntry {
    method: Method,
    pattern: RoutePattern,
    metadata: Arc<EndpointMetadata>,
}

/// Static lookup table from route identity to endpoint metadata.
///
/// Populated once at startup from the hosting layer's route declarations;
/// lookups are plain table scans over compiled patterns, first declaration
/// wins.
#[derive(Debug, Clone, Default)]
pub struct EndpointTable {
    entries: Vec<EndpointEntry>,
}

impl EndpointTable {
    /// Create a builder for declaring routes
    pub fn builder() -> EndpointTableBuilder {
        EndpointTableBuilder {
            routes: Vec::new(),
        }
    }

    /// Find the metadata for a matching declared route
    pub fn find(&self, method: &Method, path: &str) -> Option<Arc<EndpointMetadata>> {
        self.entries
            .iter()
            .find(|entry| entry.method == *method && entry.pattern.matches(path))
            .map(|entry| entry.metadata.clone())
    }

    /// Number of declared routes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any routes are declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder collecting route declarations before compiling them
pub struct EndpointTableBuilder {
    routes: Vec<(Method, String, EndpointMetadata)>,
}

impl EndpointTableBuilder {
    /// Declare a route with its authorization metadata
    pub fn route(mut self, method: Method, path: &str, metadata: EndpointMetadata) -> Self {
        self.routes.push((method, path.to_string(), metadata));
        self
    }

    /// Compile all declared routes into an immutable table
    pub fn build(self) -> Result<EndpointTable, ConfigError> {
        let mut entries: Vec<EndpointEntry> = Vec::with_capacity(self.routes.len());

        for (method, path, metadata) in self.routes {
            if entries
                .iter()
                .any(|e| e.method == method && e.pattern.pattern == path)
            {
                return Err(ConfigError::ValidationError(format!(
                    "route already declared for {} {}",
                    method, path
                )));
            }

            entries.push(EndpointEntry {
                method,
                pattern: RoutePattern::new(&path)?,
                metadata: Arc::new(metadata),
            });
        }

        Ok(EndpointTable { entries })
    }
}

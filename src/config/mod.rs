use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::registry::{ServiceScheme, ServiceTarget};
use crate::error::ConfigError;
use crate::revocation::RedisConfig;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Upstream request timeout in seconds
    pub request_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout: 30,
        }
    }
}

/// JWT validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Expected token issuer
    pub issuer: String,

    /// Expected token audience
    pub audience: Option<String>,

    /// HMAC signing key
    pub secret_key: Option<String>,

    /// Token lifetime in seconds; also bounds revocation entries
    pub token_expiration_seconds: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: "commerce-gateway".to_string(),
            audience: None,
            secret_key: None,
            token_expiration_seconds: 3600,
        }
    }
}

/// Revocation cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationConfig {
    /// Backing store: "redis" or "memory"
    pub backend: String,

    /// Redis settings, used when the backend is "redis"
    #[serde(default)]
    pub redis: RedisConfig,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            redis: RedisConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// JWT validation configuration
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Revocation cache configuration
    #[serde(default)]
    pub revocation: RevocationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Registered backend services
    #[serde(default = "default_services")]
    pub services: Vec<ServiceTarget>,
}

fn default_services() -> Vec<ServiceTarget> {
    vec![
        ServiceTarget::new("core", "127.0.0.1", ServiceScheme::Http).with_port(5100),
        ServiceTarget::new("catalog", "127.0.0.1", ServiceScheme::Http).with_port(5200),
    ]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            jwt: JwtConfig::default(),
            revocation: RevocationConfig::default(),
            logging: LoggingConfig::default(),
            services: default_services(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a JSON file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::LoadError(format!("{}: {}", path.as_ref().display(), e))
        })?;

        let mut config: GatewayConfig = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.as_ref().display(), e)))?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Override secrets from the environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("GATEWAY_JWT_SECRET") {
            self.jwt.secret_key = Some(secret);
        }
        if let Ok(url) = std::env::var("GATEWAY_REDIS_URL") {
            self.revocation.redis.url = url;
        }
    }

    /// Validate the configuration, failing fast on inconsistencies
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one service must be registered".to_string(),
            ));
        }

        match self.revocation.backend.as_str() {
            "redis" | "memory" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown revocation backend '{}'",
                    other
                )));
            }
        }

        Ok(())
    }
}

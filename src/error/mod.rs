use thiserror::Error;

/// Gateway error types
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Cache error: {0}")]
    CacheError(#[from] CacheError),

    #[error("Proxy error: {0}")]
    ProxyError(#[from] ProxyError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// HTTP status code mapping for gateway errors
impl GatewayError {
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::AuthError(AuthError::InsufficientPermissions) => 403,
            GatewayError::AuthError(_) => 401,
            GatewayError::CacheError(_) => 500,
            GatewayError::ProxyError(ProxyError::UpstreamTimeout(_)) => 504,
            GatewayError::ProxyError(_) => 502,
            GatewayError::ConfigError(_) => 500,
            GatewayError::InternalError(_) => 500,
            GatewayError::InvalidRequest(_) => 400,
            GatewayError::IoError(_) => 500,
        }
    }
}

/// Authentication specific errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Authentication service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Revocation cache specific errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to connect to cache: {0}")]
    ConnectionError(String),

    #[error("Failed to store item in cache: {0}")]
    StoreError(String),

    #[error("Failed to retrieve item from cache: {0}")]
    RetrieveError(String),
}

/// Proxy transformer specific errors
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid upstream target: {0}")]
    InvalidTarget(String),

    #[error("Failed to build outbound request: {0}")]
    RequestBuild(String),

    #[error("Failed to re-encode multipart body: {0}")]
    MultipartBody(String),

    #[error("Upstream request failed: {0}")]
    UpstreamUnreachable(String),

    #[error("Upstream request timed out: {0}")]
    UpstreamTimeout(String),
}

/// Configuration specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// Commerce Gateway Library

pub mod auth;
pub mod config;
pub mod core;
pub mod endpoints;
pub mod error;
pub mod proxy;
pub mod revocation;
pub mod server;

// Re-export commonly used types
pub use crate::auth::{
    jwt::{JwtAuthenticator, PolicyRequirement},
    models::{AuthDecision, Claims, Identity},
    Authenticator, AuthorizationEngine,
};
pub use crate::core::{
    pipeline::{DispatchOutcome, DispatchPipeline},
    registry::{ServiceRegistry, ServiceScheme, ServiceTarget},
    request::{GatewayBody, GatewayRequest},
    response::GatewayResponse,
};
pub use crate::endpoints::{AuthorizeRule, EndpointMetadata, EndpointTable};
pub use crate::error::{AuthError, CacheError, ConfigError, GatewayError, ProxyError};
pub use crate::proxy::ProxyClient;
pub use crate::revocation::{
    MemoryRevocationStore, RedisRevocationStore, RevocationCache, RevocationStore,
};

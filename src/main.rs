use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use hyper::Method;
use tracing_subscriber::EnvFilter;

use commerce_gateway::auth::jwt::JwtAuthenticator;
use commerce_gateway::auth::AuthorizationEngine;
use commerce_gateway::config::GatewayConfig;
use commerce_gateway::core::pipeline::DispatchPipeline;
use commerce_gateway::core::registry::ServiceRegistry;
use commerce_gateway::endpoints::{EndpointMetadata, EndpointTable};
use commerce_gateway::error::GatewayError;
use commerce_gateway::proxy::ProxyClient;
use commerce_gateway::revocation::{
    MemoryRevocationStore, RedisRevocationStore, RevocationCache, RevocationStore,
};
use commerce_gateway::server;

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    // Load configuration
    let config_path =
        std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "gateway.json".to_string());
    let config = match GatewayConfig::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "{}: falling back to default configuration ({})",
                config_path, err
            );
            let mut config = GatewayConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    // The forwardable services are a fixed, known set for the process lifetime
    let registry = Arc::new(ServiceRegistry::new(config.services.clone())?);
    tracing::info!("registered {} backend services", registry.len());

    let endpoints = Arc::new(declare_endpoints()?);
    tracing::info!("declared {} local endpoints", endpoints.len());

    let store: Arc<dyn RevocationStore> = match config.revocation.backend.as_str() {
        "redis" => Arc::new(RedisRevocationStore::new(config.revocation.redis.clone()).await?),
        _ => Arc::new(MemoryRevocationStore::new()),
    };
    let revocation = Arc::new(RevocationCache::new(
        store,
        Duration::from_secs(config.jwt.token_expiration_seconds),
    ));

    let authenticator = Arc::new(JwtAuthenticator::new(config.jwt.clone()));
    let engine = AuthorizationEngine::new(authenticator, revocation.clone());

    let proxy = ProxyClient::with_timeout(Duration::from_secs(config.server.request_timeout));

    let pipeline = Arc::new(DispatchPipeline::new(
        registry, endpoints, engine, proxy, revocation,
    ));

    // Routes handled by this process itself
    let local_routes = axum::Router::new().route("/health", get(|| async { "OK" }));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| GatewayError::InternalError(format!("Invalid address: {}", e)))?;

    server::serve(addr, pipeline, local_routes).await
}

/// Local route declarations carrying per-endpoint authorization metadata.
///
/// These mirror the public surface of the core and catalog services; the
/// gateway enforces what each route declares before forwarding. Literal
/// segments are declared before parameterized ones so `all`-style routes
/// win.
fn declare_endpoints() -> Result<EndpointTable, GatewayError> {
    let table = EndpointTable::builder()
        // core: authentication must stay reachable without a session
        .route(
            Method::POST,
            "/core/api/authentication/login",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::POST,
            "/core/api/authentication/register",
            EndpointMetadata::anonymous(),
        )
        // catalog: public browsing and cart surface
        .route(
            Method::GET,
            "/catalog/api/brand/:id",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::POST,
            "/catalog/api/cartitem",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/cartitem/all",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/cartitem/:id",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::DELETE,
            "/catalog/api/cartitem/:id",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::PUT,
            "/catalog/api/cartitem",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::POST,
            "/catalog/api/shoppingsession",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/shoppingsession/:id",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::DELETE,
            "/catalog/api/shoppingsession/:id",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::PUT,
            "/catalog/api/shoppingsession",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/category/all",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/category/:id",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/discount/all",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/discount/:id",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/product/all",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/product/:id",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/homepage",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/seller/:id",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/paymentcontroll",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/order/draft",
            EndpointMetadata::anonymous(),
        )
        .route(
            Method::GET,
            "/catalog/api/order/:id",
            EndpointMetadata::anonymous(),
        )
        .build()?;

    Ok(table)
}

use std::sync::Arc;

use hyper::Method;

use crate::auth::models::AuthDecision;
use crate::auth::AuthorizationEngine;
use crate::core::registry::ServiceRegistry;
use crate::core::request::GatewayRequest;
use crate::core::response::GatewayResponse;
use crate::endpoints::EndpointTable;
use crate::error::GatewayError;
use crate::proxy::ProxyClient;
use crate::revocation::RevocationCache;

/// What the hosting layer should do with a dispatched request
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The path does not target a known service; hand the request to the
    /// host's normal routing untouched
    Passthrough(GatewayRequest),

    /// The matched local endpoint overrides the gateway; run the local
    /// handler
    LocalOverride(GatewayRequest),

    /// The gateway produced a response (relayed, challenge, or forbidden)
    Completed(GatewayResponse),
}

/// Orchestrates one request through route matching, the authorization
/// decision engine, prefix stripping and the proxy transformer.
///
/// Each invocation owns its request; the only cross-request state lives in
/// the shared immutable snapshots and the revocation cache.
pub struct DispatchPipeline {
    registry: Arc<ServiceRegistry>,
    endpoints: Arc<EndpointTable>,
    engine: AuthorizationEngine,
    proxy: ProxyClient,
    revocation: Arc<RevocationCache>,
}

impl DispatchPipeline {
    /// Assemble a pipeline from its collaborators
    pub fn new(
        registry: Arc<ServiceRegistry>,
        endpoints: Arc<EndpointTable>,
        engine: AuthorizationEngine,
        proxy: ProxyClient,
        revocation: Arc<RevocationCache>,
    ) -> Self {
        Self {
            registry,
            endpoints,
            engine,
            proxy,
            revocation,
        }
    }

    /// Dispatch one request
    pub async fn dispatch(
        &self,
        mut request: GatewayRequest,
    ) -> Result<DispatchOutcome, GatewayError> {
        // Is the first path segment a service we forward to?
        let service_name = match self.registry.service_for_path(request.uri.path()) {
            Some(name) => name.to_string(),
            None => return Ok(DispatchOutcome::Passthrough(request)),
        };

        let endpoint = self.endpoints.find(&request.method, request.uri.path());

        // An override marker hands the request to the local handler with no
        // further gateway involvement
        if let Some(endpoint) = &endpoint {
            if endpoint.override_gateway {
                tracing::debug!(path = %request.uri.path(), "endpoint overrides the gateway");
                return Ok(DispatchOutcome::LocalOverride(request));
            }
        }

        match self
            .engine
            .authorize(&mut request, endpoint.as_deref())
            .await?
        {
            AuthDecision::Allow => {}
            AuthDecision::Challenge => {
                return Ok(DispatchOutcome::Completed(self.engine.challenge()));
            }
            AuthDecision::Forbid => {
                return Ok(DispatchOutcome::Completed(self.engine.forbid()));
            }
        }

        let target = self.registry.resolve(&service_name).ok_or_else(|| {
            GatewayError::InternalError(format!("no target for service '{}'", service_name))
        })?;

        // The body is consumed by forwarding; capture what the revocation
        // triggers need first
        let token = request.bearer_token().map(str::to_string);
        let method = request.method.clone();

        request.strip_route_prefix(&service_name);
        let routed_path = request.uri.path().to_string();

        tracing::info!(service = %service_name, "forwarding request for path {}", routed_path);
        let response = self.proxy.forward(request, target).await?;
        tracing::info!(
            status = %response.status.as_u16(),
            "{} {} relayed from {}",
            method,
            routed_path,
            service_name
        );

        self.revoke_if_needed(&method, &routed_path, token.as_deref())
            .await;

        Ok(DispatchOutcome::Completed(response))
    }

    /// Revoke the request's bearer token after session-ending operations:
    /// account deletion and explicit logout.
    async fn revoke_if_needed(&self, method: &Method, routed_path: &str, token: Option<&str>) {
        let Some(token) = token else { return };

        let session_ending = (*method == Method::DELETE && routed_path.contains("/api/user/account"))
            || (*method == Method::POST && routed_path.contains("/api/authentication/logout"));

        if !session_ending {
            return;
        }

        if let Err(err) = self.revocation.revoke(token).await {
            tracing::warn!("failed to revoke token after {} {}: {}", method, routed_path, err);
        } else {
            tracing::info!("revoked bearer token after {} {}", method, routed_path);
        }
    }
}

pub mod jwt;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use hyper::Method;

use crate::core::request::GatewayRequest;
use crate::core::response::GatewayResponse;
use crate::endpoints::EndpointMetadata;
use crate::error::GatewayError;
use crate::revocation::RevocationCache;

use self::models::{AuthDecision, Identity};

/// Authentication and authorization collaborator supplied by the hosting
/// layer.
///
/// The gateway only ever asks four questions: who is this caller, what does
/// an unauthenticated response look like, what does a forbidden response
/// look like, and does this identity satisfy a named policy.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Attempt to establish an identity for the request.
    ///
    /// A failure to produce an identity is not an error; unauthenticated is
    /// a valid state to carry forward.
    async fn authenticate(&self, request: &GatewayRequest) -> Option<Identity>;

    /// The standard unauthenticated response
    fn challenge(&self) -> GatewayResponse;

    /// The standard forbidden response
    fn forbid(&self) -> GatewayResponse;

    /// Evaluate a named policy against an identity
    async fn evaluate_policy(&self, identity: &Identity, policy: &str) -> bool;
}

/// Decides allow/challenge/forbid for requests targeting a known service.
///
/// Evaluated only when the path matched a registered service and the matched
/// local endpoint (if any) does not override the gateway.
pub struct AuthorizationEngine {
    authenticator: Arc<dyn Authenticator>,
    revocation: Arc<RevocationCache>,
    default_policy: String,
}

impl AuthorizationEngine {
    /// Create an engine with the default `"User"` policy for transparently
    /// forwarded requests
    pub fn new(authenticator: Arc<dyn Authenticator>, revocation: Arc<RevocationCache>) -> Self {
        Self {
            authenticator,
            revocation,
            default_policy: "User".to_string(),
        }
    }

    /// Replace the default policy name
    pub fn with_default_policy(mut self, policy: impl Into<String>) -> Self {
        self.default_policy = policy.into();
        self
    }

    /// Run the decision state machine for one request.
    ///
    /// Attaches the authenticated identity to the request as a side effect
    /// so later stages and local handlers can observe it.
    pub async fn authorize(
        &self,
        request: &mut GatewayRequest,
        endpoint: Option<&EndpointMetadata>,
    ) -> Result<AuthDecision, GatewayError> {
        // Establish an identity if the request does not carry one yet
        if request.identity.is_none() {
            if let Some(identity) = self.authenticator.authenticate(request).await {
                tracing::debug!(subject = %identity.subject, "authenticated request principal");
                request.identity = Some(identity);
            }
        }

        // Pre-flight exemption
        if request.method == Method::OPTIONS {
            return Ok(AuthDecision::Allow);
        }

        match endpoint {
            Some(endpoint) => self.authorize_declared(request, endpoint).await,
            None => self.authorize_default(request).await,
        }
    }

    /// The standard unauthenticated response
    pub fn challenge(&self) -> GatewayResponse {
        self.authenticator.challenge()
    }

    /// The standard forbidden response
    pub fn forbid(&self) -> GatewayResponse {
        self.authenticator.forbid()
    }

    /// No local route declared: require an identity, a live token, and the
    /// default policy.
    async fn authorize_default(
        &self,
        request: &GatewayRequest,
    ) -> Result<AuthDecision, GatewayError> {
        let identity = match &request.identity {
            Some(identity) => identity,
            None => return Ok(AuthDecision::Challenge),
        };

        if self.revocation.is_revoked(Some(&identity.token)).await? {
            tracing::debug!(subject = %identity.subject, "rejected revoked token");
            return Ok(AuthDecision::Challenge);
        }

        if !self
            .authenticator
            .evaluate_policy(identity, &self.default_policy)
            .await
        {
            return Ok(AuthDecision::Forbid);
        }

        Ok(AuthDecision::Allow)
    }

    /// A local route carries authorization metadata: enforce it before
    /// forwarding.
    async fn authorize_declared(
        &self,
        request: &GatewayRequest,
        endpoint: &EndpointMetadata,
    ) -> Result<AuthDecision, GatewayError> {
        if endpoint.allow_anonymous {
            return Ok(AuthDecision::Allow);
        }

        let identity = match &request.identity {
            Some(identity) => identity,
            None => return Ok(AuthDecision::Challenge),
        };

        if self.revocation.is_revoked(Some(&identity.token)).await? {
            tracing::debug!(subject = %identity.subject, "rejected revoked token");
            return Ok(AuthDecision::Challenge);
        }

        // Declared rules are evaluated in order; the first failing rule
        // forbids. No rules means authenticated is sufficient.
        for rule in &endpoint.rules {
            if !rule.roles.is_empty() && !rule.roles.iter().any(|role| identity.has_role(role)) {
                return Ok(AuthDecision::Forbid);
            }

            if let Some(policy) = &rule.policy {
                if !self.authenticator.evaluate_policy(identity, policy).await {
                    return Ok(AuthDecision::Forbid);
                }
            }
        }

        Ok(AuthDecision::Allow)
    }
}

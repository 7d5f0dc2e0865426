use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use hyper::header::{HeaderValue, WWW_AUTHENTICATE};
use hyper::StatusCode;
use jwt::{SignWithKey, VerifyWithKey};
use sha2::Sha256;

use crate::auth::models::{Claims, Identity};
use crate::auth::Authenticator;
use crate::config::JwtConfig;
use crate::core::request::GatewayRequest;
use crate::core::response::GatewayResponse;
use crate::error::AuthError;

/// Requirement backing a named authorization policy
#[derive(Debug, Clone, Default)]
pub struct PolicyRequirement {
    /// Roles satisfying the policy (any-of); empty means any authenticated
    /// identity satisfies it
    pub roles: Vec<String>,
}

impl PolicyRequirement {
    /// Policy satisfied by any of the given roles
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// JWT-based authenticator with a named-policy registry.
///
/// Validates HMAC-SHA256 bearer tokens and maps their claims to the
/// request identity. The `"User"` policy is registered by default.
pub struct JwtAuthenticator {
    config: JwtConfig,
    policies: HashMap<String, PolicyRequirement>,
}

impl JwtAuthenticator {
    /// Create a new JWT authenticator with the specified configuration
    pub fn new(config: JwtConfig) -> Self {
        let mut policies = HashMap::new();
        policies.insert("User".to_string(), PolicyRequirement::roles(["User"]));

        Self { config, policies }
    }

    /// Register or replace a named policy
    pub fn with_policy(mut self, name: impl Into<String>, requirement: PolicyRequirement) -> Self {
        self.policies.insert(name.into(), requirement);
        self
    }

    /// Verify and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let secret_key = self
            .config
            .secret_key
            .as_ref()
            .ok_or_else(|| AuthError::ServiceUnavailable("No secret key configured".to_string()))?;

        // Create HMAC-SHA256 key for verification
        let key: Hmac<Sha256> = Hmac::new_from_slice(secret_key.as_bytes())
            .map_err(|_| AuthError::ServiceUnavailable("Failed to create key".to_string()))?;

        // Verify and decode the token
        let claims: Claims = token.verify_with_key(&key).map_err(|_| AuthError::InvalidToken)?;

        if claims.is_expired() {
            return Err(AuthError::TokenExpired);
        }

        if claims.is_not_valid_yet() {
            return Err(AuthError::InvalidToken);
        }

        // Check issuer if the token carries one
        if let Some(iss) = &claims.iss {
            if iss != &self.config.issuer {
                return Err(AuthError::InvalidToken);
            }
        }

        // Check audience if configured
        if let (Some(aud), Some(expected_aud)) = (&claims.aud, &self.config.audience) {
            if aud != expected_aud {
                return Err(AuthError::InvalidToken);
            }
        }

        Ok(claims)
    }

    /// Sign claims into a token
    pub fn issue_token(&self, mut claims: Claims) -> Result<String, AuthError> {
        let secret_key = self
            .config
            .secret_key
            .as_ref()
            .ok_or_else(|| AuthError::ServiceUnavailable("No secret key configured".to_string()))?;

        let key: Hmac<Sha256> = Hmac::new_from_slice(secret_key.as_bytes())
            .map_err(|_| AuthError::ServiceUnavailable("Failed to create key".to_string()))?;

        if claims.iss.is_none() {
            claims.iss = Some(self.config.issuer.clone());
        }
        if claims.aud.is_none() {
            claims.aud = self.config.audience.clone();
        }

        claims
            .sign_with_key(&key)
            .map_err(|_| AuthError::ServiceUnavailable("Failed to sign token".to_string()))
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, request: &GatewayRequest) -> Option<Identity> {
        let token = request.bearer_token()?;

        match self.validate_token(token) {
            Ok(claims) => Some(Identity::from_claims(&claims, token)),
            Err(err) => {
                tracing::debug!("token validation failed: {}", err);
                None
            }
        }
    }

    fn challenge(&self) -> GatewayResponse {
        let mut response =
            GatewayResponse::error(StatusCode::UNAUTHORIZED, "authentication required");
        response
            .headers
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }

    fn forbid(&self) -> GatewayResponse {
        GatewayResponse::error(StatusCode::FORBIDDEN, "insufficient permissions")
    }

    async fn evaluate_policy(&self, identity: &Identity, policy: &str) -> bool {
        match self.policies.get(policy) {
            Some(requirement) => {
                requirement.roles.is_empty()
                    || requirement.roles.iter().any(|role| identity.has_role(role))
            }
            None => {
                tracing::warn!(policy, "policy is not registered, denying");
                false
            }
        }
    }
}

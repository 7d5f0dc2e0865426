use std::time::{Duration, SystemTime};

use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

/// Claims contained in a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration time (as Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// Issued at (as Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    /// Not before (as Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,

    /// JWT ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Roles held by the subject
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl Claims {
    /// Create new claims for a subject (user ID)
    pub fn new(subject: impl Into<String>) -> Self {
        // Generate a random JWT ID
        let jti: String = thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();

        Self {
            sub: subject.into(),
            iss: None,
            aud: None,
            exp: None,
            iat: Some(unix_now()),
            nbf: None,
            jti: Some(jti),
            roles: Vec::new(),
        }
    }

    /// Set expiration time
    pub fn with_expiration(mut self, duration: Duration) -> Self {
        self.exp = Some(unix_now() + duration.as_secs());
        self
    }

    /// Set issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }

    /// Set roles
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Check if the claims are expired
    pub fn is_expired(&self) -> bool {
        match self.exp {
            Some(exp) => exp < unix_now(),
            None => false,
        }
    }

    /// Check if the claims are not yet valid
    pub fn is_not_valid_yet(&self) -> bool {
        match self.nbf {
            Some(nbf) => nbf > unix_now(),
            None => false,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Authenticated principal attached to a request
#[derive(Debug, Clone)]
pub struct Identity {
    /// Subject (user ID)
    pub subject: String,

    /// Roles held by the subject
    pub roles: Vec<String>,

    /// Bearer token the identity was derived from
    pub token: String,
}

impl Identity {
    /// Build an identity from validated claims and the raw token
    pub fn from_claims(claims: &Claims, token: impl Into<String>) -> Self {
        Self {
            subject: claims.sub.clone(),
            roles: claims.roles.clone(),
            token: token.into(),
        }
    }

    /// Test role membership
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Outcome of the authorization decision engine for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// Proceed to forwarding
    Allow,

    /// Respond with the standard unauthenticated response
    Challenge,

    /// Respond with the standard forbidden response
    Forbid,
}

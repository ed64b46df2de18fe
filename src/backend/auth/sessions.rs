/**
 * JWT Token Verification
 *
 * The REST layer issues JWTs at login; the real-time relay only
 * consumes them. A connection presents its token either as the `token`
 * query parameter of the upgrade request or in a post-upgrade
 * `AUTHENTICATE` frame, and the verifier turns it into claims.
 */

use crate::backend::error::RelayError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Role granted at login (e.g. "citizen", "staff")
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Verifies tokens issued by the REST layer
///
/// Holds the shared secret so the relay never touches the environment
/// on the hot path; the secret is read once at startup by the config
/// loader.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify and decode a JWT token
    ///
    /// # Returns
    ///
    /// The authenticated user id and role, or `Unauthenticated` if the
    /// token is invalid, expired or carries a malformed subject.
    pub fn verify(&self, token: &str) -> Result<(Uuid, Option<String>), RelayError> {
        let key = DecodingKey::from_secret(self.secret.as_ref());
        let validation = Validation::default();

        let token_data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| RelayError::Unauthenticated(format!("Invalid token: {}", e)))?;

        let user_id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|e| RelayError::Unauthenticated(format!("Invalid user ID in token: {}", e)))?;

        Ok((user_id, token_data.claims.role))
    }

    /// Create a JWT token for a user
    ///
    /// The relay itself never issues tokens in production; this exists
    /// for the test suite and local tooling.
    pub fn issue(
        &self,
        user_id: Uuid,
        role: Option<String>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        // Token expires in 30 days
        let exp = now + (30 * 24 * 60 * 60);

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            exp,
            iat: now,
        };

        let key = EncodingKey::from_secret(self.secret.as_ref());
        encode(&Header::default(), &claims, &key)
    }
}

//! services/api/src/adapters/identity.rs
//!
//! Bearer token validation for the hosted auth provider. Access tokens are
//! HS256-signed JWTs whose `sub` claim is the user's id.

use async_trait::async_trait;
use dormduty_core::{
    domain::Identity,
    ports::{IdentityProvider, PortError, PortResult},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct AccessTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// An adapter that implements `IdentityProvider` by checking the token signature locally.
#[derive(Clone)]
pub struct JwtIdentityAdapter {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityAdapter {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityAdapter {
    async fn verify_token(&self, token: &str) -> PortResult<Identity> {
        let data = decode::<AccessTokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            PortError::Unauthorized
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| {
            warn!("Bearer token subject is not a user id");
            PortError::Unauthorized
        })?;

        Ok(Identity {
            user_id,
            email: data.claims.email,
        })
    }
}

// JWT encoding and decoding

use crate::errors::AuthError;
use crate::models::UserClaims;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use tracing::{instrument, warn};

/// JWT codec for access and refresh tokens (HS256)
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
}

impl JwtService {
    /// Create a new JWT service with the given secret
    #[instrument(skip(secret))]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    /// Encode claims into a signed token
    #[instrument(skip(self, claims), fields(typ = ?claims.typ))]
    pub fn encode_token(&self, claims: &UserClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode JWT token");
            AuthError::AuthenticationFailed(format!("Failed to encode token: {}", e))
        })
    }

    /// Verify the signature and decode claims.
    ///
    /// Expiry is not checked here. Callers compare `exp` against their own clock.
    #[instrument(skip(self, token))]
    pub fn decode_token(&self, token: &str) -> Result<UserClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let token_data =
            decode::<UserClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                warn!(error = %e, "Failed to decode JWT token");
                AuthError::InvalidToken(format!("Token validation failed: {}", e))
            })?;

        Ok(token_data.claims)
    }
}

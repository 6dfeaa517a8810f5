// Access/refresh token issuance and refresh-token rotation

use super::jwt::JwtService;
use super::token_store::RefreshTokenStore;
use crate::errors::AuthError;
use crate::models::{TokenType, UserClaims, UserRole};
use crate::telemetry;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Tokens returned by login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: i64,
    pub refresh_expires_at: i64,
}

/// Issues access tokens and single-use refresh tokens
#[derive(Clone)]
pub struct TokenService {
    jwt: JwtService,
    store: Arc<dyn RefreshTokenStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(
        secret: &str,
        access_ttl_minutes: u64,
        refresh_ttl_days: u64,
        store: Arc<dyn RefreshTokenStore>,
    ) -> Self {
        Self {
            jwt: JwtService::new(secret),
            store,
            access_ttl: Duration::minutes(access_ttl_minutes as i64),
            refresh_ttl: Duration::days(refresh_ttl_days as i64),
        }
    }

    pub async fn issue_pair(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(user_id, email, role, Utc::now()).await
    }

    /// Sign a new access/refresh pair and register the refresh token
    #[instrument(skip(self, email))]
    pub async fn issue_pair_at(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let access = self.claims(user_id, email, role, TokenType::Access, now);
        let refresh = self.claims(user_id, email, role, TokenType::Refresh, now);

        let access_token = self.jwt.encode_token(&access)?;
        let refresh_token = self.jwt.encode_token(&refresh)?;

        let ttl = self.refresh_ttl.to_std().map_err(|e| {
            AuthError::AuthenticationFailed(format!("Invalid refresh token TTL: {}", e))
        })?;
        self.store
            .save(&refresh.jti, user_id, ttl)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, user_id = %user_id, "Failed to register refresh token");
                AuthError::AuthenticationFailed(format!("Failed to store refresh token: {}", e))
            })?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at: access.exp,
            refresh_expires_at: refresh.exp,
        })
    }

    pub fn validate_access(&self, token: &str) -> Result<UserClaims, AuthError> {
        self.validate_access_at(token, Utc::now())
    }

    /// Check signature, token type and expiry of an access token
    #[instrument(skip(self, token))]
    pub fn validate_access_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<UserClaims, AuthError> {
        let claims = self.jwt.decode_token(token)?;
        if claims.typ != TokenType::Access {
            warn!(user_id = %claims.sub, "Refresh token presented as access token");
            return Err(AuthError::InvalidToken("Not an access token".to_string()));
        }
        if claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.refresh_at(refresh_token, Utc::now()).await
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The presented token is consumed. Presenting a token whose id is no
    /// longer registered (already exchanged, or revoked) revokes every other
    /// refresh token of that user.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_at(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.jwt.decode_token(refresh_token).inspect_err(|_| {
            telemetry::record_token_refresh("invalid");
        })?;

        if claims.typ != TokenType::Refresh {
            telemetry::record_token_refresh("invalid");
            return Err(AuthError::InvalidToken("Not a refresh token".to_string()));
        }

        if claims.exp <= now.timestamp() {
            telemetry::record_token_refresh("expired");
            return Err(AuthError::TokenExpired);
        }

        let user_id = claims.user_id().ok_or_else(|| {
            AuthError::InvalidToken("Token subject is not a user id".to_string())
        })?;

        let owner = self.store.take(&claims.jti).await.map_err(|e| {
            tracing::error!(error = %e, "Refresh token store unavailable");
            AuthError::AuthenticationFailed(format!("Failed to read refresh token: {}", e))
        })?;

        match owner {
            None => {
                warn!(user_id = %user_id, "Refresh token replayed, revoking all sessions");
                telemetry::record_token_refresh("reused");
                if let Err(e) = self.store.revoke_all(user_id).await {
                    tracing::error!(error = %e, user_id = %user_id, "Failed to revoke sessions");
                }
                return Err(AuthError::RefreshTokenReused);
            }
            Some(owner) if owner != user_id => {
                telemetry::record_token_refresh("invalid");
                return Err(AuthError::InvalidToken(
                    "Refresh token owner mismatch".to_string(),
                ));
            }
            Some(_) => {}
        }

        let pair = self
            .issue_pair_at(user_id, &claims.email, claims.role, now)
            .await?;

        telemetry::record_token_refresh("success");
        info!(user_id = %user_id, "Token refreshed");
        Ok(pair)
    }

    /// Revoke one of `owner`'s refresh tokens. Expired or already revoked tokens are a no-op.
    #[instrument(skip(self, refresh_token))]
    pub async fn revoke(&self, refresh_token: &str, owner: Uuid) -> Result<(), AuthError> {
        let claims = self.jwt.decode_token(refresh_token)?;
        if claims.typ != TokenType::Refresh {
            return Err(AuthError::InvalidToken("Not a refresh token".to_string()));
        }
        if claims.user_id() != Some(owner) {
            return Err(AuthError::InvalidToken("Token belongs to another user".to_string()));
        }

        self.store.revoke(&claims.jti).await.map_err(|e| {
            AuthError::AuthenticationFailed(format!("Failed to revoke refresh token: {}", e))
        })
    }

    #[instrument(skip(self))]
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        self.store.revoke_all(user_id).await.map_err(|e| {
            AuthError::AuthenticationFailed(format!("Failed to revoke refresh tokens: {}", e))
        })
    }

    fn claims(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
        typ: TokenType,
        now: DateTime<Utc>,
    ) -> UserClaims {
        let ttl = match typ {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        UserClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            typ,
            jti: Uuid::new_v4().to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_store::InMemoryRefreshTokenStore;

    fn service(store: Arc<InMemoryRefreshTokenStore>) -> TokenService {
        TokenService::new("test-secret", 60, 14, store)
    }

    #[tokio::test]
    async fn test_issue_pair_registers_refresh_token() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = service(store.clone());
        let user = Uuid::new_v4();

        let pair = tokens
            .issue_pair(user, "a@b.com", UserRole::User)
            .await
            .expect("issue");

        assert_eq!(store.live_count().await, 1);
        assert!(pair.refresh_expires_at > pair.access_expires_at);

        let claims = tokens.validate_access(&pair.access_token).expect("valid");
        assert_eq!(claims.user_id(), Some(user));
        assert_eq!(claims.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_old_token_dies() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = service(store.clone());
        let user = Uuid::new_v4();
        let first = tokens
            .issue_pair(user, "a@b.com", UserRole::User)
            .await
            .expect("issue");

        let second = tokens.refresh(&first.refresh_token).await.expect("refresh");
        assert_ne!(second.refresh_token, first.refresh_token);
        assert_eq!(store.live_count().await, 1);

        let replay = tokens.refresh(&first.refresh_token).await;
        assert!(matches!(replay, Err(AuthError::RefreshTokenReused)));
    }

    #[tokio::test]
    async fn test_replay_revokes_other_sessions() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = service(store.clone());
        let user = Uuid::new_v4();
        let phone = tokens
            .issue_pair(user, "a@b.com", UserRole::User)
            .await
            .expect("issue");
        let tablet = tokens
            .issue_pair(user, "a@b.com", UserRole::User)
            .await
            .expect("issue");

        let rotated = tokens.refresh(&phone.refresh_token).await.expect("refresh");
        assert!(tokens.refresh(&phone.refresh_token).await.is_err());

        assert!(matches!(
            tokens.refresh(&tablet.refresh_token).await,
            Err(AuthError::RefreshTokenReused)
        ));
        assert!(matches!(
            tokens.refresh(&rotated.refresh_token).await,
            Err(AuthError::RefreshTokenReused)
        ));
    }

    #[tokio::test]
    async fn test_expired_refresh_token() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = service(store.clone());
        let pair = tokens
            .issue_pair(Uuid::new_v4(), "a@b.com", UserRole::User)
            .await
            .expect("issue");

        let later = Utc::now() + Duration::days(15);
        let result = tokens.refresh_at(&pair.refresh_token, later).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
        // An expired token is rejected before it touches the store
        assert_eq!(store.live_count().await, 1);
    }

    #[tokio::test]
    async fn test_token_types_are_not_interchangeable() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = service(store);
        let pair = tokens
            .issue_pair(Uuid::new_v4(), "a@b.com", UserRole::Admin)
            .await
            .expect("issue");

        assert!(matches!(
            tokens.validate_access(&pair.refresh_token),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            tokens.refresh(&pair.access_token).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_access_token_expiry() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = service(store);
        let pair = tokens
            .issue_pair(Uuid::new_v4(), "a@b.com", UserRole::User)
            .await
            .expect("issue");

        let just_before = Utc::now() + Duration::minutes(59);
        assert!(tokens.validate_access_at(&pair.access_token, just_before).is_ok());

        let after = Utc::now() + Duration::minutes(61);
        assert!(matches!(
            tokens.validate_access_at(&pair.access_token, after),
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = service(store.clone());
        let user = Uuid::new_v4();
        let pair = tokens
            .issue_pair(user, "a@b.com", UserRole::User)
            .await
            .expect("issue");

        tokens.revoke(&pair.refresh_token, user).await.expect("revoke");
        tokens.revoke(&pair.refresh_token, user).await.expect("revoke again");
        assert_eq!(store.live_count().await, 0);
        assert!(tokens.refresh(&pair.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_cannot_revoke_another_users_token() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = service(store.clone());
        let pair = tokens
            .issue_pair(Uuid::new_v4(), "a@b.com", UserRole::User)
            .await
            .expect("issue");

        let result = tokens.revoke(&pair.refresh_token, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
        assert_eq!(store.live_count().await, 1);
    }

    #[tokio::test]
    async fn test_role_survives_refresh() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = service(store);
        let pair = tokens
            .issue_pair(Uuid::new_v4(), "admin@b.com", UserRole::Admin)
            .await
            .expect("issue");
        let refreshed = tokens.refresh(&pair.refresh_token).await.expect("refresh");
        let claims = tokens
            .validate_access(&refreshed.access_token)
            .expect("valid");
        assert!(claims.is_admin());
    }
}

// Account lifecycle: signup, login, logout and account deletion

use super::tokens::{TokenPair, TokenService};
use crate::db::repositories::UserRepository;
use crate::errors::{AppError, AuthError, DatabaseError};
use crate::models::{User, UserRole};
use crate::telemetry;
use crate::validation::{
    generate_invite_code, normalize_email, required_text, validate_not_future, validate_password,
    MAX_NICKNAME_LENGTH,
};
use chrono::{NaiveDate, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const INVITE_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
    pub birthday: Option<NaiveDate>,
}

/// Hash on the blocking pool; bcrypt is deliberately slow
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::AuthenticationFailed(format!("Hashing task failed: {}", e)))?
        .map_err(|e| {
            error!(error = %e, "Failed to hash password");
            AuthError::AuthenticationFailed(format!("Password hashing failed: {}", e))
        })
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::AuthenticationFailed(format!("Verification task failed: {}", e)))?
        .map_err(|e| {
            error!(error = %e, "Failed to verify password");
            AuthError::AuthenticationFailed(format!("Password verification failed: {}", e))
        })
}

#[derive(Clone)]
pub struct AccountService {
    users: UserRepository,
    tokens: TokenService,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(users: UserRepository, tokens: TokenService) -> Self {
        Self {
            users,
            tokens,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new user. A registered email (including deleted accounts) is a `Conflict`.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: SignupRequest) -> Result<User, AppError> {
        let email = normalize_email(&request.email)?;
        validate_password(&request.password)?;
        let nickname = required_text("nickname", &request.nickname, MAX_NICKNAME_LENGTH)?;
        if let Some(birthday) = request.birthday {
            validate_not_future("birthday", birthday, Utc::now().date_naive())?;
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("Email is already registered"));
        }

        let invite_code = self.unique_invite_code().await?;
        let password_hash = hash_password(&request.password, self.bcrypt_cost).await?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash,
            nickname,
            birthday: request.birthday,
            profile_image: None,
            invite_code,
            cup_id: None,
            role: UserRole::User,
            deleted: false,
            created_at: now,
            updated_at: now,
        };

        self.users.create(&user).await.map_err(|e| match e {
            // Lost a race with a concurrent signup for the same email
            DatabaseError::DuplicateKey(_) => AppError::conflict("Email is already registered"),
            other => AppError::from(other),
        })?;

        info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    async fn unique_invite_code(&self) -> Result<String, AppError> {
        for _ in 0..INVITE_CODE_ATTEMPTS {
            let code = generate_invite_code();
            if !self.users.invite_code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(AppError::internal("Could not allocate an invite code"))
    }

    /// Check credentials and issue a token pair
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), AppError> {
        let email = email.trim().to_lowercase();

        let Some(user) = self.users.find_by_email(&email).await? else {
            telemetry::record_login("invalid_credentials");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Invalid password");
            telemetry::record_login("invalid_credentials");
            return Err(AuthError::InvalidCredentials.into());
        }

        if user.deleted {
            telemetry::record_login("deleted");
            return Err(AuthError::AccountDeleted.into());
        }

        let pair = self
            .tokens
            .issue_pair(user.id, &user.email, user.role)
            .await?;

        telemetry::record_login("success");
        info!(user_id = %user.id, "User logged in");
        Ok((user, pair))
    }

    /// Revoke one refresh token; already revoked tokens are accepted
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AppError> {
        self.tokens.revoke(refresh_token, user_id).await?;
        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        let revoked = self.tokens.revoke_all(user_id).await?;
        info!(user_id = %user_id, revoked, "User logged out of all sessions");
        Ok(revoked)
    }

    /// Soft delete the account, dissolve its couple and end every session
    #[instrument(skip(self))]
    pub async fn delete_account(&self, user_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let dissolved = self.users.soft_delete(user_id).await?;
        self.tokens.revoke_all(user_id).await?;
        info!(user_id = %user_id, "Account deleted");
        Ok(dissolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum cost keeps the tests fast
    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("correct horse", TEST_COST).await.expect("hash");
        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse", &hash).await.expect("verify"));
        assert!(!verify_password("wrong horse", &hash).await.expect("verify"));
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let a = hash_password("same password", TEST_COST).await.expect("hash");
        let b = hash_password("same password", TEST_COST).await.expect("hash");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_verify_against_garbage_hash_fails() {
        let result = verify_password("x", "not-a-bcrypt-hash").await;
        assert!(matches!(result, Err(AuthError::AuthenticationFailed(_))));
    }
}

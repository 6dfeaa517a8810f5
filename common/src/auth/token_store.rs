// Refresh token registry
//
// A refresh token is valid only while its `jti` is present in the store.
// `take` removes the entry atomically, which makes every refresh token single-use.

use crate::db::RedisPool;
use crate::errors::StorageError;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Register a refresh token id for `user_id`, expiring after `ttl`
    async fn save(&self, jti: &str, user_id: Uuid, ttl: Duration) -> Result<(), StorageError>;

    /// Remove the token id and return its owner; `None` if unknown or expired
    async fn take(&self, jti: &str) -> Result<Option<Uuid>, StorageError>;

    /// Forget a single token id; unknown ids are ignored
    async fn revoke(&self, jti: &str) -> Result<(), StorageError> {
        self.take(jti).await.map(|_| ())
    }

    /// Remove every refresh token of a user, returning how many were live
    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, StorageError>;
}

fn token_key(jti: &str) -> String {
    format!("refresh_token:{}", jti)
}

fn user_index_key(user_id: Uuid) -> String {
    format!("user_refresh_tokens:{}", user_id)
}

/// Redis-backed store
///
/// Layout: `refresh_token:{jti}` → user id (with TTL) and a per-user set
/// `user_refresh_tokens:{user_id}` used to revoke all sessions at once.
#[derive(Clone)]
pub struct RedisRefreshTokenStore {
    pool: RedisPool,
}

impl RedisRefreshTokenStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for RedisRefreshTokenStore {
    #[instrument(skip(self, jti))]
    async fn save(&self, jti: &str, user_id: Uuid, ttl: Duration) -> Result<(), StorageError> {
        let mut conn = self.pool.get_connection();
        let ttl_secs = ttl.as_secs().max(1);
        let index_key = user_index_key(user_id);

        let _: () = redis::pipe()
            .atomic()
            .set_ex(token_key(jti), user_id.to_string(), ttl_secs)
            .ignore()
            .sadd(&index_key, jti)
            .ignore()
            .expire(&index_key, ttl_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        debug!(user_id = %user_id, ttl_secs, "Refresh token registered");
        Ok(())
    }

    #[instrument(skip(self, jti))]
    async fn take(&self, jti: &str) -> Result<Option<Uuid>, StorageError> {
        let mut conn = self.pool.get_connection();

        let owner: Option<String> = redis::cmd("GETDEL")
            .arg(token_key(jti))
            .query_async(&mut conn)
            .await?;

        let Some(owner) = owner else {
            return Ok(None);
        };

        let user_id = Uuid::parse_str(&owner).map_err(|e| {
            StorageError::RedisError(format!("Corrupt refresh token entry: {}", e))
        })?;

        let _: () = conn.srem(user_index_key(user_id), jti).await?;
        Ok(Some(user_id))
    }

    #[instrument(skip(self))]
    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, StorageError> {
        let mut conn = self.pool.get_connection();
        let index_key = user_index_key(user_id);

        let jtis: Vec<String> = conn.smembers(&index_key).await?;
        let mut keys: Vec<String> = jtis.iter().map(|jti| token_key(jti)).collect();
        let live = keys.len();
        keys.push(index_key);

        let removed: u64 = conn.del(keys).await?;

        // The index key itself is counted by DEL when it existed
        let revoked = if live > 0 { removed.saturating_sub(1) } else { 0 };
        debug!(user_id = %user_id, revoked, "Revoked all refresh tokens");
        Ok(revoked)
    }
}

#[derive(Default)]
struct MemoryState {
    tokens: HashMap<String, (Uuid, Instant)>,
    by_user: HashMap<Uuid, HashSet<String>>,
}

/// In-process store for tests and single-node development
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    state: Mutex<MemoryState>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered, unexpired tokens
    pub async fn live_count(&self) -> usize {
        let now = Instant::now();
        let state = self.state.lock().await;
        state
            .tokens
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn save(&self, jti: &str, user_id: Uuid, ttl: Duration) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        state
            .tokens
            .insert(jti.to_string(), (user_id, Instant::now() + ttl));
        state
            .by_user
            .entry(user_id)
            .or_default()
            .insert(jti.to_string());
        Ok(())
    }

    async fn take(&self, jti: &str) -> Result<Option<Uuid>, StorageError> {
        let mut state = self.state.lock().await;
        let Some((user_id, expires_at)) = state.tokens.remove(jti) else {
            return Ok(None);
        };
        if let Some(set) = state.by_user.get_mut(&user_id) {
            set.remove(jti);
        }
        if expires_at <= Instant::now() {
            return Ok(None);
        }
        Ok(Some(user_id))
    }

    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, StorageError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let jtis = state.by_user.remove(&user_id).unwrap_or_default();
        let mut revoked = 0;
        for jti in jtis {
            if let Some((_, expires_at)) = state.tokens.remove(&jti) {
                if expires_at > now {
                    revoked += 1;
                }
            }
        }
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_take_is_single_use() {
        let store = InMemoryRefreshTokenStore::new();
        let user = Uuid::new_v4();
        store.save("a", user, HOUR).await.expect("save");

        assert_eq!(store.take("a").await.expect("take"), Some(user));
        assert_eq!(store.take("a").await.expect("take"), None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_not_returned() {
        let store = InMemoryRefreshTokenStore::new();
        store
            .save("a", Uuid::new_v4(), Duration::ZERO)
            .await
            .expect("save");
        assert_eq!(store.take("a").await.expect("take"), None);
    }

    #[tokio::test]
    async fn test_revoke_all_only_affects_one_user() {
        let store = InMemoryRefreshTokenStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.save("a1", alice, HOUR).await.expect("save");
        store.save("a2", alice, HOUR).await.expect("save");
        store.save("b1", bob, HOUR).await.expect("save");

        assert_eq!(store.revoke_all(alice).await.expect("revoke"), 2);
        assert_eq!(store.take("a1").await.expect("take"), None);
        assert_eq!(store.take("b1").await.expect("take"), Some(bob));
        assert_eq!(store.live_count().await, 0);
    }

    #[test]
    fn test_key_layout() {
        let user = Uuid::nil();
        assert_eq!(token_key("abc"), "refresh_token:abc");
        assert_eq!(
            user_index_key(user),
            "user_refresh_tokens:00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_redis_store_take_is_single_use() {
        let pool = RedisPool::new(&crate::config::RedisConfig {
            url: "redis://localhost:6379".to_string(),
        })
        .await
        .expect("Redis available");
        let store = RedisRefreshTokenStore::new(pool);
        let user = Uuid::new_v4();
        let jti = Uuid::new_v4().to_string();

        store.save(&jti, user, HOUR).await.expect("save");
        assert_eq!(store.take(&jti).await.expect("take"), Some(user));
        assert_eq!(store.take(&jti).await.expect("take"), None);
    }
}

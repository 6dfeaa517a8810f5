// Redis connection manager and health check

use crate::config::RedisConfig;
use crate::errors::StorageError;
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

/// Multiplexed Redis connection shared by the refresh token store
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
}

impl RedisPool {
    #[instrument(skip(config))]
    pub async fn new(config: &RedisConfig) -> Result<Self, StorageError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            StorageError::ConnectionFailed(format!("Invalid Redis URL: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to Redis");
            StorageError::ConnectionFailed(format!("Failed to connect to Redis: {}", e))
        })?;

        info!("Redis connection established");
        Ok(Self { manager })
    }

    /// The manager reconnects on its own; clones share one connection
    pub fn get_connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), StorageError> {
        let mut conn = self.get_connection();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StorageError::RedisError(format!("PING failed: {}", e)))?;

        if pong != "PONG" {
            return Err(StorageError::RedisError(format!(
                "Unexpected PING reply: {}",
                pong
            )));
        }
        Ok(())
    }
}

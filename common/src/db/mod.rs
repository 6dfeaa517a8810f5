// Database layer: PostgreSQL pool, Redis connection manager and repositories

pub mod pool;
pub mod redis;
pub mod repositories;

pub use pool::DbPool;
pub use redis::RedisPool;

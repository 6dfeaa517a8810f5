// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub upload: UploadConfig,
    pub tour_api: TourApiConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// S3-compatible object storage (MinIO in development)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    /// Base URL clients use to fetch stored objects, e.g. a CDN in front of the bucket
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_minutes: u64,
    pub refresh_token_ttl_days: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_bytes: usize,
    pub max_files_per_request: usize,
    pub allowed_content_types: Vec<String>,
}

/// Korea Tourism Organization open-data API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourApiConfig {
    pub base_url: String,
    pub service_key: String,
    pub mobile_os: String,
    pub mobile_app: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub tracing_endpoint: Option<String>,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Local overrides, not committed to git
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("upload.allowed_content_types")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }

        if self.redis.url.is_empty() {
            return Err("Redis URL cannot be empty".to_string());
        }

        if self.storage.endpoint.is_empty() {
            return Err("Storage endpoint cannot be empty".to_string());
        }
        if self.storage.bucket.is_empty() {
            return Err("Storage bucket cannot be empty".to_string());
        }

        if self.auth.jwt_secret.is_empty() {
            return Err("JWT secret cannot be empty".to_string());
        }
        if self.auth.access_token_ttl_minutes == 0 {
            return Err("Access token TTL must be greater than 0".to_string());
        }
        if self.auth.refresh_token_ttl_days == 0 {
            return Err("Refresh token TTL must be greater than 0".to_string());
        }

        if self.upload.max_file_size_bytes == 0 {
            return Err("Upload max_file_size_bytes must be greater than 0".to_string());
        }
        if self.upload.max_files_per_request == 0 {
            return Err("Upload max_files_per_request must be greater than 0".to_string());
        }
        if self.upload.allowed_content_types.is_empty() {
            return Err("Upload allowed_content_types cannot be empty".to_string());
        }

        if self.tour_api.base_url.is_empty() {
            return Err("Tour API base URL cannot be empty".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_seconds: default_request_timeout_seconds(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/twogether".to_string(),
                max_connections: 10,
                min_connections: 2,
                connect_timeout_seconds: 30,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
            },
            storage: StorageConfig {
                endpoint: "http://localhost:9000".to_string(),
                access_key: "minioadmin".to_string(),
                secret_key: "minioadmin".to_string(),
                bucket: "twogether".to_string(),
                region: "us-east-1".to_string(),
                public_base_url: "http://localhost:9000/twogether".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                access_token_ttl_minutes: 60,
                refresh_token_ttl_days: 14,
            },
            upload: UploadConfig {
                max_file_size_bytes: 10 * 1024 * 1024,
                max_files_per_request: 10,
                allowed_content_types: vec![
                    "image/jpeg".to_string(),
                    "image/png".to_string(),
                    "image/gif".to_string(),
                    "image/webp".to_string(),
                    "image/heic".to_string(),
                ],
            },
            tour_api: TourApiConfig {
                base_url: "https://apis.data.go.kr/B551011/KorService1".to_string(),
                service_key: String::new(),
                mobile_os: "ETC".to_string(),
                mobile_app: "Twogether".to_string(),
                timeout_seconds: 10,
                max_retries: 2,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                tracing_endpoint: None,
            },
        }
    }
}

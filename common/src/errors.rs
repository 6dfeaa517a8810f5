// Error handling framework
// Domain errors are converted into AppError, the single HTTP-facing error type

use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Authentication and authorization errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Refresh token has already been used or revoked")]
    RefreshTokenReused,

    #[error("Account has been deleted")]
    AccountDeleted,

    #[error("Insufficient permissions: required {0}")]
    InsufficientPermissions(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFieldValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Database-specific errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate key violation: {0}")]
    DuplicateKey(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Key-value and object storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    RedisError(String),

    #[error("Object storage error: {0}")]
    ObjectStoreError(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

/// Errors from the tourism open-data API
#[derive(Error, Debug)]
pub enum TourApiError {
    #[error("Tour API request failed: {0}")]
    RequestFailed(String),

    #[error("Tour API returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Tour API service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("Invalid Tour API response: {0}")]
    InvalidResponse(String),

    #[error("Tour content not found: {0}")]
    NotFound(String),
}

impl TourApiError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            TourApiError::RequestFailed(_) => true,
            TourApiError::UpstreamStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// HTTP error returned by every handler
///
/// Each variant carries the message placed in the `{"message": ...}` body.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InternalServer(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::InternalServer(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalServer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = Json(json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::InvalidToken(_) => {
                AppError::Unauthorized("Invalid or malformed token".to_string())
            }
            AuthError::TokenExpired => AppError::Unauthorized("Token has expired".to_string()),
            AuthError::RefreshTokenReused => AppError::Unauthorized(
                "Refresh token has already been used or revoked".to_string(),
            ),
            AuthError::AccountDeleted => {
                AppError::Unauthorized("Account has been deleted".to_string())
            }
            AuthError::InsufficientPermissions(_) => {
                AppError::Forbidden("Insufficient permissions".to_string())
            }
            AuthError::AuthenticationFailed(msg) => {
                tracing::error!(error = %msg, "Authentication failure");
                AppError::InternalServer("Authentication failed".to_string())
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => AppError::NotFound(msg),
            DatabaseError::DuplicateKey(msg) | DatabaseError::Conflict(msg) => {
                AppError::Conflict(msg)
            }
            DatabaseError::ForeignKeyViolation(msg) => AppError::BadRequest(msg),
            other => {
                tracing::error!(error = %other, "Database failure");
                AppError::InternalServer("Database error".to_string())
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidUpload(msg) => AppError::BadRequest(msg),
            other => {
                tracing::error!(error = %other, "Storage failure");
                AppError::InternalServer("Storage error".to_string())
            }
        }
    }
}

impl From<TourApiError> for AppError {
    fn from(err: TourApiError) -> Self {
        match err {
            TourApiError::NotFound(msg) => AppError::NotFound(msg),
            other => {
                tracing::error!(error = %other, "Tour API failure");
                AppError::InternalServer("Failed to fetch place information".to_string())
            }
        }
    }
}

// Extractor rejections share the `{"message"}` body with every other error.
// Rejections axum reports as 5xx are routing bugs, not client input.
fn from_rejection(status: StatusCode, text: String) -> AppError {
    if status.is_server_error() {
        tracing::error!(error = %text, "Extractor misconfigured");
        AppError::InternalServer("Internal server error".to_string())
    } else {
        AppError::BadRequest(text)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

// Implement From for common external errors
impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => DatabaseError::DuplicateKey(db_err.message().to_string()),
                        "23503" => DatabaseError::ForeignKeyViolation(db_err.message().to_string()),
                        _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                    }
                } else {
                    DatabaseError::QueryFailed(db_err.message().to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(err.to_string())
    }
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        StorageError::RedisError(err.to_string())
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::InvalidJson(err.to_string())
    }
}

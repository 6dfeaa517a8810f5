// Upload validation, key layout and compensating deletes
//
// Objects are written before the database row that references them. When a
// later step fails, the objects written so far are removed best-effort; a
// failed cleanup is logged and never masks the original error.

use super::ObjectStorage;
use crate::config::UploadConfig;
use crate::errors::StorageError;
use crate::telemetry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Top-level folder of an object key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPrefix {
    Profiles,
    Couples,
    Albums,
    Inquiries,
}

impl UploadPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPrefix::Profiles => "profiles",
            UploadPrefix::Couples => "couples",
            UploadPrefix::Albums => "albums",
            UploadPrefix::Inquiries => "inquiries",
        }
    }
}

impl fmt::Display for UploadPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file received from a multipart request
#[derive(Clone)]
pub struct UploadFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Where an uploaded file ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub size_bytes: i64,
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        _ => "bin",
    }
}

/// `{prefix}/{owner}/{uuid}.{ext}`
pub fn object_key(prefix: UploadPrefix, owner: Uuid, content_type: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        prefix,
        owner,
        Uuid::new_v4(),
        extension_for(content_type)
    )
}

#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn ObjectStorage>,
    config: UploadConfig,
}

impl UploadService {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: UploadConfig) -> Self {
        Self { storage, config }
    }

    pub fn max_files_per_request(&self) -> usize {
        self.config.max_files_per_request
    }

    pub fn url(&self, key: &str) -> String {
        self.storage.public_url(key)
    }

    pub fn url_opt(&self, key: Option<&str>) -> Option<String> {
        key.map(|k| self.storage.public_url(k))
    }

    /// Reject empty, oversize, or disallowed files
    pub fn validate(&self, file: &UploadFile) -> Result<(), StorageError> {
        if file.data.is_empty() {
            return Err(StorageError::InvalidUpload("File is empty".to_string()));
        }
        if file.data.len() > self.config.max_file_size_bytes {
            return Err(StorageError::InvalidUpload(format!(
                "File exceeds the maximum size of {} bytes",
                self.config.max_file_size_bytes
            )));
        }

        let content_type = file.content_type.to_ascii_lowercase();
        if !self
            .config
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&content_type))
        {
            return Err(StorageError::InvalidUpload(format!(
                "Content type '{}' is not allowed",
                file.content_type
            )));
        }
        Ok(())
    }

    pub fn validate_count(&self, count: usize) -> Result<(), StorageError> {
        if count > self.config.max_files_per_request {
            return Err(StorageError::InvalidUpload(format!(
                "At most {} files may be uploaded at once",
                self.config.max_files_per_request
            )));
        }
        Ok(())
    }

    /// Validate and store a single file
    #[instrument(skip(self, file), fields(prefix = %prefix, size = file.data.len()))]
    pub async fn upload(
        &self,
        prefix: UploadPrefix,
        owner: Uuid,
        file: &UploadFile,
    ) -> Result<StoredObject, StorageError> {
        self.validate(file)?;

        let content_type = file.content_type.to_ascii_lowercase();
        let key = object_key(prefix, owner, &content_type);
        self.storage
            .put_object(&key, &file.data, &content_type)
            .await?;

        telemetry::record_upload(prefix.as_str(), file.data.len() as u64);
        debug!(key = %key, "Upload stored");

        Ok(StoredObject {
            key,
            content_type,
            size_bytes: file.data.len() as i64,
        })
    }

    /// Store every file or none of them.
    ///
    /// All files are validated before the first write. If a write fails, the
    /// objects already written are deleted best-effort.
    #[instrument(skip(self, files), fields(prefix = %prefix, count = files.len()))]
    pub async fn upload_all(
        &self,
        prefix: UploadPrefix,
        owner: Uuid,
        files: &[UploadFile],
    ) -> Result<Vec<StoredObject>, StorageError> {
        self.validate_count(files.len())?;
        for file in files {
            self.validate(file)?;
        }

        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            match self.upload(prefix, owner, file).await {
                Ok(object) => stored.push(object),
                Err(e) => {
                    warn!(error = %e, uploaded = stored.len(), "Upload failed, rolling back stored objects");
                    let keys: Vec<String> = stored.into_iter().map(|o| o.key).collect();
                    self.delete_best_effort(&keys).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Delete objects, logging failures instead of returning them
    #[instrument(skip(self, keys), fields(count = keys.len()))]
    pub async fn delete_best_effort(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete_object(key).await {
                warn!(error = %e, key = %key, "Failed to delete object, leaving it orphaned");
            }
        }
    }
}

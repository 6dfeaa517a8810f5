// Object storage for user uploads (profile images, couple thumbnails, album photos, inquiry attachments)

pub mod memory;
pub mod minio;
pub mod upload;

pub use memory::InMemoryStorage;
pub use minio::MinioStorage;
pub use upload::{StoredObject, UploadFile, UploadPrefix, UploadService};

use crate::errors::StorageError;
use async_trait::async_trait;

/// S3-compatible object store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Deleting a missing key is not an error
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// URL clients use to download the object
    fn public_url(&self, key: &str) -> String;
}

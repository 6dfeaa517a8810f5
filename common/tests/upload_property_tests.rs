// Property-based tests for upload validation and storage

use common::config::UploadConfig;
use common::errors::{AppError, StorageError};
use common::storage::upload::object_key;
use common::storage::{InMemoryStorage, UploadFile, UploadPrefix, UploadService};
use proptest::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

const MAX_SIZE: usize = 1024;
const MAX_FILES: usize = 4;

fn create_test_service() -> (UploadService, Arc<InMemoryStorage>) {
    let storage = Arc::new(InMemoryStorage::new("http://cdn.test/bucket"));
    let config = UploadConfig {
        max_file_size_bytes: MAX_SIZE,
        max_files_per_request: MAX_FILES,
        allowed_content_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
    };
    (UploadService::new(storage.clone(), config), storage)
}

fn image(size: usize) -> UploadFile {
    UploadFile {
        file_name: Some("photo.jpg".to_string()),
        content_type: "image/jpeg".to_string(),
        data: vec![0xAB; size],
    }
}

fn prefix_strategy() -> impl Strategy<Value = UploadPrefix> {
    prop_oneof![
        Just(UploadPrefix::Profiles),
        Just(UploadPrefix::Couples),
        Just(UploadPrefix::Albums),
        Just(UploadPrefix::Inquiries),
    ]
}

// Keys are `{prefix}/{owner}/{uuid}.{ext}` and never collide
#[test]
fn property_object_keys_are_namespaced() {
    proptest!(|(prefix in prefix_strategy(), png in any::<bool>())| {
        let owner = Uuid::new_v4();
        let content_type = if png { "image/png" } else { "image/jpeg" };

        let key = object_key(prefix, owner, content_type);
        let other = object_key(prefix, owner, content_type);
        prop_assert_ne!(&key, &other);

        let parts: Vec<&str> = key.split('/').collect();
        prop_assert_eq!(parts.len(), 3);
        prop_assert_eq!(parts[0], prefix.as_str());
        prop_assert_eq!(parts[1], owner.to_string());
        prop_assert!(parts[2].ends_with(if png { ".png" } else { ".jpg" }), "unexpected key: {}", parts[2]);
    });
}

// Size limits are inclusive; empty files are never accepted
#[test]
fn property_size_limit() {
    proptest!(|(size in 0usize..(MAX_SIZE * 2))| {
        let (service, _) = create_test_service();
        let result = service.validate(&image(size));
        prop_assert_eq!(result.is_ok(), size > 0 && size <= MAX_SIZE);
        if let Err(e) = result {
            prop_assert!(matches!(AppError::from(e), AppError::BadRequest(_)));
        }
    });
}

// Content type matching ignores case
#[test]
fn property_content_type_case_insensitive() {
    proptest!(|(upper in prop::collection::vec(any::<bool>(), 10))| {
        let (service, _) = create_test_service();
        let content_type: String = "image/jpeg"
            .chars()
            .zip(upper.iter())
            .map(|(c, up)| if *up { c.to_ascii_uppercase() } else { c })
            .collect();
        let mut file = image(16);
        file.content_type = content_type;
        prop_assert!(service.validate(&file).is_ok());
    });
}

#[test]
fn property_disallowed_content_type() {
    proptest!(|(subtype in "[a-z]{3,8}")| {
        prop_assume!(subtype != "jpeg" && subtype != "png");
        let (service, _) = create_test_service();
        let mut file = image(16);
        file.content_type = format!("application/{}", subtype);
        prop_assert!(matches!(service.validate(&file), Err(StorageError::InvalidUpload(_))));
    });
}

// upload_all stores every file or none: one bad file anywhere rejects the batch
#[test]
fn property_upload_all_is_all_or_nothing() {
    proptest!(|(count in 1usize..=MAX_FILES, bad_index in any::<prop::sample::Index>(), include_bad in any::<bool>())| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (service, storage) = create_test_service();
            let mut files: Vec<UploadFile> = (0..count).map(|i| image(i + 1)).collect();
            if include_bad {
                let idx = bad_index.index(count);
                files[idx] = image(MAX_SIZE + 1);
            }

            let result = service
                .upload_all(UploadPrefix::Albums, Uuid::new_v4(), &files)
                .await;

            if include_bad {
                prop_assert!(result.is_err());
                prop_assert!(storage.is_empty().await);
            } else {
                let stored = result.unwrap();
                prop_assert_eq!(stored.len(), count);
                prop_assert_eq!(storage.len().await, count);
                for (object, file) in stored.iter().zip(files.iter()) {
                    prop_assert_eq!(object.size_bytes, file.data.len() as i64);
                }
            }
            Ok(())
        })?;
    });
}

#[tokio::test]
async fn test_too_many_files_rejected_before_writing() {
    let (service, storage) = create_test_service();
    let files: Vec<UploadFile> = (0..=MAX_FILES).map(|_| image(8)).collect();

    let result = service
        .upload_all(UploadPrefix::Inquiries, Uuid::new_v4(), &files)
        .await;
    assert!(matches!(result, Err(StorageError::InvalidUpload(_))));
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_delete_best_effort_ignores_missing_keys() {
    let (service, storage) = create_test_service();
    let stored = service
        .upload(UploadPrefix::Profiles, Uuid::new_v4(), &image(8))
        .await
        .unwrap();
    assert_eq!(
        service.url(&stored.key),
        format!("http://cdn.test/bucket/{}", stored.key)
    );

    service
        .delete_best_effort(&[stored.key.clone(), "profiles/missing.jpg".to_string()])
        .await;
    assert!(storage.is_empty().await);
}

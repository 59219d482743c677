#[cfg(feature = "storage-s3")]
use crate::S3Uploader;
use crate::{ObjectStoreUploader, StorageResult};
use intake_core::StorageConfig;
use std::sync::Arc;

/// Create the object-store uploader for the given settings.
///
/// Returns `Ok(None)` when the settings are not eligible for object-store
/// uploads; every upload then stays local.
pub async fn create_uploader(
    config: &StorageConfig,
) -> StorageResult<Option<Arc<dyn ObjectStoreUploader>>> {
    if !config.is_object_store_eligible() {
        tracing::info!("Object store not configured, uploads stay local");
        return Ok(None);
    }

    #[cfg(feature = "storage-s3")]
    {
        let uploader = S3Uploader::new(config).await?;
        Ok(Some(Arc::new(uploader)))
    }

    #[cfg(not(feature = "storage-s3"))]
    {
        Err(crate::StorageError::ConfigError(
            "S3 uploader not available (storage-s3 feature not enabled)".to_string(),
        ))
    }
}

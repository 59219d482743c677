use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use intake_core::{StorageConfig, UploadToken};

use crate::keys;
use crate::traits::{ObjectStoreUploader, StorageError, StorageResult};

/// S3 uploader returning presigned GET URLs
#[derive(Clone)]
pub struct S3Uploader {
    client: Client,
    bucket: String,
    url_ttl: Duration,
    request_timeout: Duration,
}

impl std::fmt::Debug for S3Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Uploader")
            .field("bucket", &self.bucket)
            .field("url_ttl", &self.url_ttl)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl S3Uploader {
    /// Create a new S3Uploader from the storage settings.
    ///
    /// Uses the static credentials from the config, never the ambient AWS
    /// credential chain. Fails with [`StorageError::ConfigError`] when the
    /// settings are not eligible for object-store uploads.
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        let (Some(access_key), Some(secret_key), Some(bucket), Some(url_ttl)) = (
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            config.bucket_name.clone(),
            config.url_ttl(),
        ) else {
            return Err(StorageError::ConfigError(
                "S3 credentials, bucket and URL TTL are required".to_string(),
            ));
        };

        if !config.is_object_store_eligible() {
            return Err(StorageError::ConfigError(
                "S3 settings are incomplete".to_string(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ));

        if let Some(ref endpoint) = config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        // S3-compatible providers generally need path-style addressing
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        tracing::info!(
            bucket = %bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            url_ttl_secs = url_ttl.as_secs(),
            "S3 uploader initialized"
        );

        Ok(S3Uploader {
            client: Client::from_conf(s3_config),
            bucket,
            url_ttl,
            request_timeout: config.request_timeout(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_and_presign(&self, local_path: &Path, key: &str) -> StorageResult<String> {
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            StorageError::RemoteStore(format!(
                "Failed to open {} for upload: {}",
                local_path.display(),
                e
            ))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::AuthenticatedRead)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                StorageError::RemoteStore(format!("S3 put failed: {}", DisplayErrorContext(&e)))
            })?;

        let presigning = PresigningConfig::expires_in(self.url_ttl)
            .map_err(|e| StorageError::ConfigError(format!("Invalid URL TTL: {}", e)))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                StorageError::RemoteStore(format!(
                    "Failed to presign URL: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(presigned.uri().to_string())
    }
}

#[async_trait]
impl ObjectStoreUploader for S3Uploader {
    async fn upload(
        &self,
        local_path: &Path,
        filename: &str,
        token: &UploadToken,
    ) -> StorageResult<String> {
        let key = keys::object_key(token, filename);
        let start = std::time::Instant::now();

        let result = tokio::time::timeout(self.request_timeout, self.put_and_presign(local_path, &key))
            .await
            .unwrap_or_else(|_| {
                Err(StorageError::RemoteStore(format!(
                    "S3 upload timed out after {}s",
                    self.request_timeout.as_secs()
                )))
            });

        match result {
            Ok(url) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload successful"
                );
                Ok(url)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    fn eligible_config() -> StorageConfig {
        StorageConfig {
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            bucket_name: Some("intake-test".to_string()),
            url_ttl_seconds: Some(600),
            ..StorageConfig::default()
        }
    }

    #[tokio::test]
    async fn test_new_rejects_missing_credentials() {
        let config = StorageConfig {
            access_key_id: None,
            ..eligible_config()
        };
        let result = S3Uploader::new(&config).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_new_rejects_blank_bucket() {
        let config = StorageConfig {
            bucket_name: Some("  ".to_string()),
            ..eligible_config()
        };
        let result = S3Uploader::new(&config).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_new_with_eligible_config() {
        let uploader = S3Uploader::new(&eligible_config()).await.unwrap();
        assert_eq!(uploader.bucket(), "intake-test");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_remote_store_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = StorageConfig {
            endpoint: Some(format!("http://127.0.0.1:{}", port)),
            request_timeout_seconds: 5,
            ..eligible_config()
        };
        let uploader = S3Uploader::new(&config).await.unwrap();

        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"payload").unwrap();
        let token = UploadToken::generate(Utc::now());

        let result = uploader.upload(file.path(), "report.csv", &token).await;
        assert!(matches!(result, Err(StorageError::RemoteStore(_))));
    }
}

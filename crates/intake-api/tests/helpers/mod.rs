//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p intake-api --test upload_test`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use intake_api::setup::routes;
use intake_api::AppState;
use intake_core::{IntakeConfig, StorageConfig, UploadToken};
use intake_services::{
    LocalStager, ObjectStoreUploader, StorageError, StorageResult, UploadCoordinator,
};
use tempfile::TempDir;

/// Test application: server and owned upload directory.
pub struct TestApp {
    pub server: TestServer,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// On-disk path for a `/uploads/...` locator.
    pub fn staged_path(&self, locator: &str) -> std::path::PathBuf {
        self.uploads
            .path()
            .join(locator.trim_start_matches("/uploads/"))
    }
}

/// Object store that always rejects uploads.
pub struct RejectingUploader;

#[async_trait]
impl ObjectStoreUploader for RejectingUploader {
    async fn upload(
        &self,
        _local_path: &Path,
        _filename: &str,
        _token: &UploadToken,
    ) -> StorageResult<String> {
        Err(StorageError::RemoteStore("AccessDenied".to_string()))
    }
}

fn build(uploader: Option<Arc<dyn ObjectStoreUploader>>, storage: StorageConfig) -> TestApp {
    let uploads = TempDir::new().expect("Failed to create temp dir");

    let config = IntakeConfig {
        uploads_path: uploads.path().to_path_buf(),
        storage: storage.clone(),
        ..IntakeConfig::default()
    };

    let mut coordinator = UploadCoordinator::new(LocalStager::new(uploads.path()), storage);
    if let Some(uploader) = uploader {
        coordinator = coordinator.with_uploader(uploader);
    }

    let app = routes::setup_routes(AppState::new(coordinator, config));
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp { server, uploads }
}

/// Local-only app: no object store, no replication.
pub fn setup_test_app() -> TestApp {
    build(None, StorageConfig::default())
}

/// App whose object store is configured but fails every upload.
pub fn setup_failing_object_store_app() -> TestApp {
    let storage = StorageConfig {
        access_key_id: Some("AKIDEXAMPLE".to_string()),
        secret_access_key: Some("secret".to_string()),
        bucket_name: Some("intake".to_string()),
        url_ttl_seconds: Some(600),
        ..StorageConfig::default()
    };
    build(Some(Arc::new(RejectingUploader)), storage)
}

/// `/uploads/<20 hex>/<basename>`
pub fn assert_local_locator(locator: &str, basename: &str) {
    let rest = locator
        .strip_prefix("/uploads/")
        .unwrap_or_else(|| panic!("locator {} does not start with /uploads/", locator));
    let (token, name) = rest.split_once('/').expect("locator has no token segment");
    assert_eq!(token.len(), 20, "token {}", token);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(name, basename);
}

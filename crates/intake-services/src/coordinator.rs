//! Upload coordinator.
//!
//! Turns one inbound [`UploadRequest`] into an [`UploadResult`]:
//!
//! 1. No payload: empty result, `must_enqueue = true`.
//! 2. Object store eligible and the file is not a long upload: push to the
//!    object store (staging first only when no backing file exists), release
//!    the relay copy, return the presigned URL.
//! 3. Otherwise: stage locally and return `/uploads/<token>/<basename>`.
//!    `must_enqueue` is `false` only when the push was deferred as a long upload.
//!
//! Every staged copy is handed to the replicator on a detached task. A relay
//! copy is removed once its replication attempt ends, or right away when
//! replication is off.
//!
//! Staging and object-store failures propagate. Replication never does.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use intake_core::{
    AppError, IntakeConfig, StorageConfig, UploadPayload, UploadRequest, UploadResult, UploadToken,
};
use intake_replication::{RemoteReplicator, ReplicationJob};
use intake_storage::{create_uploader, LocalStager, ObjectStoreUploader, StagedFile};

pub struct UploadCoordinator {
    stager: LocalStager,
    storage: StorageConfig,
    uploader: Option<Arc<dyn ObjectStoreUploader>>,
    replicator: Option<Arc<RemoteReplicator>>,
}

impl UploadCoordinator {
    /// Coordinator that only stages locally.
    pub fn new(stager: LocalStager, storage: StorageConfig) -> Self {
        Self {
            stager,
            storage,
            uploader: None,
            replicator: None,
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn ObjectStoreUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_replicator(mut self, replicator: Arc<RemoteReplicator>) -> Self {
        self.replicator = Some(replicator);
        self
    }

    /// Build the full pipeline from configuration.
    pub async fn from_config(config: &IntakeConfig) -> Result<Self, AppError> {
        let stager = LocalStager::new(&config.uploads_path);
        let replicator = Arc::new(RemoteReplicator::new(
            config.replication.clone(),
            stager.uploads_root(),
        ));

        let mut coordinator =
            Self::new(stager, config.storage.clone()).with_replicator(replicator);
        if let Some(uploader) = create_uploader(&config.storage).await? {
            coordinator = coordinator.with_uploader(uploader);
        }

        tracing::info!(
            uploads_root = %coordinator.stager.uploads_root().display(),
            object_store = coordinator.object_store().is_some(),
            replication = config.replication.enabled,
            "Upload coordinator ready"
        );

        Ok(coordinator)
    }

    pub fn stager(&self) -> &LocalStager {
        &self.stager
    }

    fn active_replicator(&self) -> Option<&Arc<RemoteReplicator>> {
        self.replicator.as_ref().filter(|r| r.is_enabled())
    }

    /// The uploader, if the settings allow object-store uploads.
    fn object_store(&self) -> Option<&Arc<dyn ObjectStoreUploader>> {
        if self.storage.is_object_store_eligible() {
            self.uploader.as_ref()
        } else {
            None
        }
    }

    /// Ingest one request received at `now`.
    pub async fn handle(
        &self,
        request: UploadRequest,
        now: DateTime<Utc>,
    ) -> Result<UploadResult, AppError> {
        let Some(payload) = request.into_payload() else {
            tracing::debug!("Upload request carried no file");
            return Ok(UploadResult::empty());
        };

        let token = UploadToken::generate(now);
        let filename = payload.filename().to_string();
        let start = Instant::now();

        let result = match payload.backing_path().map(Path::to_path_buf) {
            Some(backing) => {
                let size = tokio::fs::metadata(&backing).await?.len();
                self.handle_backed(payload, &backing, size, &token, &filename)
                    .await?
            }
            None => self.handle_streamed(payload, &token, &filename).await?,
        };

        tracing::info!(
            token = %token,
            filename = %filename,
            locator = ?result.locator,
            must_enqueue = result.must_enqueue,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload handled"
        );

        Ok(result)
    }

    async fn handle_backed(
        &self,
        payload: UploadPayload,
        backing: &Path,
        size: u64,
        token: &UploadToken,
        filename: &str,
    ) -> Result<UploadResult, AppError> {
        if let Some(uploader) = self.object_store() {
            if !self.storage.is_long_upload(size) {
                tracing::debug!(
                    token = %token,
                    size_bytes = size,
                    branch = "remote",
                    "Pushing backing file"
                );
                let url = uploader.upload(backing, filename, token).await?;
                return Ok(UploadResult::remote(url));
            }
        }

        let staged = self.stager.stage(payload, token, filename).await?;
        Ok(self.retain_local(staged, size))
    }

    async fn handle_streamed(
        &self,
        payload: UploadPayload,
        token: &UploadToken,
        filename: &str,
    ) -> Result<UploadResult, AppError> {
        let staged = self.stager.stage(payload, token, filename).await?;
        let size = staged.size();

        let Some(uploader) = self.object_store() else {
            return Ok(self.retain_local(staged, size));
        };
        if self.storage.is_long_upload(size) {
            return Ok(self.retain_local(staged, size));
        }

        tracing::debug!(
            token = %token,
            size_bytes = size,
            branch = "remote",
            "Pushing relay copy"
        );
        let uploaded = uploader.upload(staged.path(), filename, token).await;
        self.release_relay(staged).await;

        Ok(UploadResult::remote(uploaded?))
    }

    /// Keep the staged copy, schedule replication and build the local result.
    fn retain_local(&self, staged: StagedFile, size: u64) -> UploadResult {
        let long_upload = self.storage.is_long_upload(size);
        let branch = if long_upload { "local-deferred" } else { "local" };
        tracing::debug!(
            token = %staged.token(),
            size_bytes = size,
            branch = branch,
            "Retaining staged file"
        );

        if let Some(replicator) = self.active_replicator() {
            // Detached: the handle is dropped and the outcome only logged
            drop(replicator.spawn(replication_job(&staged)));
        }

        UploadResult::local(staged.locator(), !long_upload)
    }

    /// Mirror the relay copy in the background and delete it afterwards.
    async fn release_relay(&self, staged: StagedFile) {
        let Some(replicator) = self.active_replicator() else {
            discard_relay(&self.stager, &staged).await;
            return;
        };

        let replicator = Arc::clone(replicator);
        let stager = self.stager.clone();
        tokio::spawn(async move {
            replicator.replicate(&replication_job(&staged)).await;
            discard_relay(&stager, &staged).await;
        });
    }
}

fn replication_job(staged: &StagedFile) -> ReplicationJob {
    ReplicationJob::new(staged.token().clone(), staged.basename(), staged.path())
}

async fn discard_relay(stager: &LocalStager, staged: &StagedFile) {
    if let Err(e) = stager.remove(staged).await {
        tracing::warn!(
            error = %e,
            path = %staged.path().display(),
            "Failed to remove relay copy"
        );
    }
}

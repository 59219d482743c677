use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ReplicationResult;

/// Where and how to push one staged file.
#[derive(Debug, Clone)]
pub struct MirrorTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    /// Bounds connection setup and the whole transfer.
    pub timeout: Duration,
    pub local_path: PathBuf,
    /// Remote token directory, created if missing.
    pub remote_dir: PathBuf,
    pub remote_path: PathBuf,
}

/// Secure file-transfer session used by the replicator.
#[async_trait]
pub trait MirrorTransport: Send + Sync {
    /// Copy `target.local_path` to `target.remote_path` on `target.host`.
    async fn push(&self, target: &MirrorTarget) -> ReplicationResult<()>;
}

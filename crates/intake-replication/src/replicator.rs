use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use intake_core::{ReplicationConfig, UploadToken};
use tokio::task::JoinHandle;

use crate::host::{classify_host, CommandHostnameProbe, HostPool, HostnameProbe};
use crate::probe::{is_reachable, PROBE_TIMEOUT};
use crate::sftp::SftpTransport;
use crate::transport::{MirrorTarget, MirrorTransport};

/// One staged file to mirror.
#[derive(Debug, Clone)]
pub struct ReplicationJob {
    pub token: UploadToken,
    pub basename: String,
    pub local_path: PathBuf,
}

impl ReplicationJob {
    pub fn new(
        token: UploadToken,
        basename: impl Into<String>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            token,
            basename: basename.into(),
            local_path: local_path.into(),
        }
    }
}

/// How a replication attempt ended. Only `Completed` means the file was copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationOutcome {
    Disabled,
    /// Probe output did not map to a pool, or the probe itself failed.
    UnknownHost(String),
    /// The pool has no configured host.
    NoHost(HostPool),
    Unreachable { host: String, port: u16 },
    TimedOut,
    Failed(String),
    Completed,
}

impl ReplicationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ReplicationOutcome::Completed)
    }
}

/// Best-effort mirror of staged uploads to the secondary fileserver.
pub struct RemoteReplicator {
    config: ReplicationConfig,
    local_uploads_root: PathBuf,
    hostname_probe: Arc<dyn HostnameProbe>,
    transport: Arc<dyn MirrorTransport>,
    probe_timeout: Duration,
}

impl RemoteReplicator {
    /// Replicator using the configured hostname command and SFTP.
    ///
    /// `local_uploads_root` is the remote root too unless
    /// `remote_uploads_root` is configured.
    pub fn new(config: ReplicationConfig, local_uploads_root: impl Into<PathBuf>) -> Self {
        let hostname_probe = Arc::new(CommandHostnameProbe::new(
            config.local_hostname_probe_command.clone(),
        ));
        Self {
            config,
            local_uploads_root: local_uploads_root.into(),
            hostname_probe,
            transport: Arc::new(SftpTransport::new()),
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_hostname_probe(mut self, probe: Arc<dyn HostnameProbe>) -> Self {
        self.hostname_probe = probe;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn MirrorTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn remote_root(&self) -> &Path {
        self.config
            .remote_uploads_root
            .as_deref()
            .unwrap_or(self.local_uploads_root.as_path())
    }

    fn pool_host(&self, pool: HostPool) -> Option<&str> {
        let host = match pool {
            HostPool::PoolA => self.config.pool_a_host.as_deref(),
            HostPool::PoolB => self.config.pool_b_host.as_deref(),
            HostPool::Unknown => None,
        };
        host.filter(|h| !h.trim().is_empty())
    }

    /// Run `replicate` on a detached task.
    ///
    /// Callers may drop the handle; the outcome is already logged.
    pub fn spawn(self: &Arc<Self>, job: ReplicationJob) -> JoinHandle<ReplicationOutcome> {
        let replicator = Arc::clone(self);
        tokio::spawn(async move { replicator.replicate(&job).await })
    }

    /// Mirror one staged file. Never fails; every outcome other than
    /// `Completed` or `Disabled` is logged as a warning.
    pub async fn replicate(&self, job: &ReplicationJob) -> ReplicationOutcome {
        if !self.config.enabled {
            tracing::debug!(token = %job.token, "Replication disabled, skipping");
            return ReplicationOutcome::Disabled;
        }

        let start = Instant::now();
        let outcome = self.attempt(job).await;

        match &outcome {
            ReplicationOutcome::Completed => tracing::info!(
                token = %job.token,
                basename = %job.basename,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Replication completed"
            ),
            ReplicationOutcome::Disabled => {}
            other => tracing::warn!(
                token = %job.token,
                basename = %job.basename,
                outcome = ?other,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Replication skipped or failed"
            ),
        }

        outcome
    }

    async fn attempt(&self, job: &ReplicationJob) -> ReplicationOutcome {
        let probe_output = match self.hostname_probe.probe().await {
            Ok(output) => output,
            Err(e) => return ReplicationOutcome::UnknownHost(e.to_string()),
        };

        let pool = classify_host(&probe_output);
        if pool == HostPool::Unknown {
            return ReplicationOutcome::UnknownHost(probe_output);
        }

        let Some(host) = self.pool_host(pool) else {
            return ReplicationOutcome::NoHost(pool);
        };

        let port = self.config.port;
        if !is_reachable(host, port, self.probe_timeout).await {
            return ReplicationOutcome::Unreachable {
                host: host.to_string(),
                port,
            };
        }

        let remote_dir = self.remote_root().join(job.token.as_str());
        let target = MirrorTarget {
            host: host.to_string(),
            port,
            username: self.config.username.clone().unwrap_or_default(),
            password: self.config.password.clone(),
            timeout: self.config.connect_timeout(),
            local_path: job.local_path.clone(),
            remote_path: remote_dir.join(&job.basename),
            remote_dir,
        };

        tracing::debug!(
            host = %target.host,
            pool = ?pool,
            remote_path = %target.remote_path.display(),
            "Starting replication transfer"
        );

        match self.transport.push(&target).await {
            Ok(()) => ReplicationOutcome::Completed,
            Err(e) if e.is_timeout() => ReplicationOutcome::TimedOut,
            Err(e) => ReplicationOutcome::Failed(e.to_string()),
        }
    }
}

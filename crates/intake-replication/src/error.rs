use std::time::Duration;

use thiserror::Error;

/// Replication failures. These are logged by the replicator and never reach
/// the upload caller.
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("Hostname probe failed: {0}")]
    HostnameProbe(String),

    #[error("Transfer timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReplicationResult<T> = Result<T, ReplicationError>;

impl ReplicationError {
    pub fn is_timeout(&self) -> bool {
        match self {
            ReplicationError::Timeout(_) => true,
            ReplicationError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

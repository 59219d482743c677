//! Destination pool selection from the local hostname.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{ReplicationError, ReplicationResult};

/// Character position inspected in the probed hostname.
const POOL_CHAR_INDEX: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPool {
    PoolA,
    PoolB,
    Unknown,
}

/// Classify the output of the hostname probe.
///
/// Looks only at the character at index 1: `j` selects pool A, `y` selects
/// pool B. Anything else, including output too short to have that character,
/// is [`HostPool::Unknown`].
pub fn classify_host(probe_output: &str) -> HostPool {
    match probe_output.trim().chars().nth(POOL_CHAR_INDEX) {
        Some('j') => HostPool::PoolA,
        Some('y') => HostPool::PoolB,
        _ => HostPool::Unknown,
    }
}

/// Source of the local host's name.
#[async_trait]
pub trait HostnameProbe: Send + Sync {
    async fn probe(&self) -> ReplicationResult<String>;
}

/// Runs a shell command and returns its trimmed stdout.
#[derive(Debug, Clone)]
pub struct CommandHostnameProbe {
    command: String,
}

impl CommandHostnameProbe {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl HostnameProbe for CommandHostnameProbe {
    async fn probe(&self) -> ReplicationResult<String> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await
            .map_err(|e| {
                ReplicationError::HostnameProbe(format!(
                    "Failed to run '{}': {}",
                    self.command, e
                ))
            })?;

        if !output.status.success() {
            return Err(ReplicationError::HostnameProbe(format!(
                "'{}' exited with {}",
                self.command, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

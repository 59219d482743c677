use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::constants::UPLOAD_TOKEN_LENGTH;

static TOKEN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque per-upload directory name.
///
/// The token is the first 20 hex characters of a SHA-256 digest over
/// `"<now in UTC>--<salt>"`. The salt combines a process-wide sequence number
/// with a random UUID, so two uploads of the same file name in the same second
/// still land in different directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadToken(String);

impl UploadToken {
    /// Generate a fresh token for a request received at `now`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let sequence = TOKEN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let salt = format!("{}-{}", sequence, Uuid::new_v4());
        Self::derive(now, &salt)
    }

    /// Deterministic derivation from a timestamp and salt.
    pub fn derive(now: DateTime<Utc>, salt: &str) -> Self {
        let input = format!("{}--{}", now.format("%Y-%m-%d %H:%M:%S UTC"), salt);
        let digest = hex::encode(Sha256::digest(input.as_bytes()));
        UploadToken(digest[..UPLOAD_TOKEN_LENGTH].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UploadToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for UploadToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// What the caller gets back from the coordinator.
///
/// `locator` is either a presigned object-store URL or a local fragment of the
/// form `/uploads/<token>/<basename>`. `must_enqueue` tells the caller whether
/// its normal post-processing job still has to be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub locator: Option<String>,
    pub must_enqueue: bool,
}

impl UploadResult {
    /// Nothing was uploaded; the caller treats this as "nothing to do".
    pub fn empty() -> Self {
        Self {
            locator: None,
            must_enqueue: true,
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            locator: Some(url.into()),
            must_enqueue: true,
        }
    }

    pub fn local(locator: impl Into<String>, must_enqueue: bool) -> Self {
        Self {
            locator: Some(locator.into()),
            must_enqueue,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locator.is_none()
    }
}

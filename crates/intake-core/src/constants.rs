//! Constants shared across intake crates.

/// Uploads root used when no `UPLOADS_PATH` is configured. Relative paths are
/// resolved against the process working directory.
pub const DEFAULT_UPLOADS_PATH: &str = "public/uploads";

/// Prefix of every local locator handed back to callers.
pub const UPLOADS_LOCATOR_PREFIX: &str = "/uploads";

/// Files strictly larger than this are pushed to the object store asynchronously
/// when async long uploads are enabled (50 MiB).
pub const MAX_SYNC_UPLOAD_BYTES: u64 = 52_428_800;

/// Number of hex characters kept from the token digest.
pub const UPLOAD_TOKEN_LENGTH: usize = 20;

/// Region used for the object store when none is configured.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Upper bound for a single object-store request.
pub const DEFAULT_S3_REQUEST_TIMEOUT_SECS: u64 = 300;

/// SFTP port used by the remote mirror when none is configured.
pub const DEFAULT_REPLICATION_PORT: u16 = 22;

/// Connection timeout for the remote mirror session.
pub const DEFAULT_REPLICATION_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Command used to discover the local host name for pool selection.
pub const DEFAULT_HOSTNAME_COMMAND: &str = "hostname";

//! Intake Replication Library
//!
//! Best-effort mirroring of staged uploads to a secondary fileserver over SFTP.
//!
//! Nothing in this crate returns an error to the upload path. The replicator
//! reports a [`ReplicationOutcome`], logs every non-success at `warn`, and the
//! coordinator drops the task handle.
//!
//! # Flow
//!
//! 1. Skip when replication is disabled.
//! 2. Probe the local hostname and classify it into a destination pool.
//! 3. TCP-probe the pool host with a one-second timeout.
//! 4. Open an SFTP session and copy `<token>/<basename>` under the remote root.

pub mod error;
pub mod host;
pub mod probe;
pub mod replicator;
pub mod sftp;
pub mod transport;

pub use error::{ReplicationError, ReplicationResult};
pub use host::{classify_host, CommandHostnameProbe, HostPool, HostnameProbe};
pub use probe::{is_reachable, PROBE_TIMEOUT};
pub use replicator::{RemoteReplicator, ReplicationJob, ReplicationOutcome};
pub use sftp::SftpTransport;
pub use transport::{MirrorTarget, MirrorTransport};

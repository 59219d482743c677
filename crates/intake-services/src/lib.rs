//! Intake Services Layer
//!
//! Hosts the upload coordinator and re-exports the storage and replication
//! types it wires together, so the API crate depends on a single facade. Keep
//! thin HTTP handling in intake-api.

pub mod coordinator;

pub use coordinator::UploadCoordinator;
pub use intake_replication::{RemoteReplicator, ReplicationJob, ReplicationOutcome};
pub use intake_storage::{
    create_uploader, LocalStager, ObjectStoreUploader, StagedFile, StorageError, StorageResult,
};

//! Intake Core Library
//!
//! This crate provides the domain types, error types and configuration shared by
//! every intake component: the upload request/payload model, upload tokens,
//! upload results, and the storage and replication settings.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{IntakeConfig, ReplicationConfig, ServerConfig, StorageConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AttachedFile, BoxedReader, PayloadBody, RawBody, UploadPayload, UploadRequest, UploadResult,
    UploadToken,
};

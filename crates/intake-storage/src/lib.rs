//! Intake Storage Library
//!
//! Local staging and object-store upload for the intake pipeline.
//!
//! # Layout
//!
//! Both sides use the same token-scoped layout:
//!
//! - **Local staging**: `<uploads_root>/<token>/<sanitized_basename>`
//! - **Object store key**: `<token>/<sanitized_basename>`
//!
//! Basenames never contain spaces or directory components. Key and path
//! generation is centralized in the `keys` module so both sides stay consistent.

pub mod factory;
pub mod keys;
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_uploader;
pub use local::{LocalStager, StagedFile};
#[cfg(feature = "storage-s3")]
pub use s3::S3Uploader;
pub use traits::{ObjectStoreUploader, StorageError, StorageResult};

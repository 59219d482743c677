//! Domain models for the upload pipeline.

pub mod payload;
pub mod upload;

pub use payload::{AttachedFile, BoxedReader, PayloadBody, RawBody, UploadPayload, UploadRequest};
pub use upload::{UploadResult, UploadToken};

//! Intake Infrastructure Library
//!
//! Shared infrastructure for the intake binaries:
//! - Telemetry initialization (tracing subscriber)
//! - Request ID middleware
//! - HTTP error response body

pub mod error;
pub mod middleware;
pub mod telemetry;

pub use error::ErrorResponse;
pub use middleware::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};

//! Intake API Library
//!
//! Thin HTTP adapter over the upload coordinator: request decoding, response
//! encoding, and application setup.

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod utils;

pub use error::HttpAppError;
pub use intake_infra::ErrorResponse;
pub use state::AppState;

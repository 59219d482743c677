//! Tracing initialization
//!
//! Installs a global `tracing` subscriber with an `EnvFilter` and either the
//! human-readable or the JSON formatter.

mod init;

pub use init::{init_telemetry, shutdown_telemetry, LogFormat, DEFAULT_FILTER};

//! Logging infrastructure for the refract compiler.
//!
//! Library crates log through `tracing` macros only; binaries call
//! [`init_logging`] once at start-up.
//!
//! # Usage
//!
//! ```ignore
//! use refract_telemetry::{init_logging, LogFormat, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("debug")
//!     .with_log_format(LogFormat::Json);
//!
//! init_logging(&config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::{events, init_logging};

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

//! Structured logging to stderr.
//!
//! Stdout is reserved for compiler output, so every layer writes to stderr.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    // Build the env filter from config or RUST_LOG
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// A compilation run is starting.
    pub const COMPILE_STARTED: &str = "compile_started";

    /// A compilation run finished successfully.
    pub const COMPILE_FINISHED: &str = "compile_finished";

    /// A compilation run stopped on a fatal error.
    pub const COMPILE_FAILED: &str = "compile_failed";

    /// A reference was resolved on request from the command line.
    pub const REFERENCE_RESOLVED: &str = "reference_resolved";
}

/// Helper macros for structured logging with standard fields.
#[macro_export]
macro_rules! log_compile_started {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::COMPILE_STARTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_compile_finished {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::COMPILE_FINISHED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_compile_failed {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::COMPILE_FAILED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_reference_resolved {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::REFERENCE_RESOLVED,
            $($field)*
        )
    };
}

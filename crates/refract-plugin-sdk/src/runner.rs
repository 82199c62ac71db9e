//! Standard I/O driver for plugin executables.

use std::io::{Read, Write};
use std::process::ExitCode;

use prost::Message;
use thiserror::Error;

use crate::types::{ExtensionRequest, ExtensionResponse};

/// Errors raised while talking to the compiler.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Reading the request or writing the response failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request bytes were not a valid `ExtensionRequest`.
    #[error("failed to decode extension request: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Read one request from `input`, pass it to `handler`, write the response to `output`.
pub fn run_with_io<R, W, F>(mut input: R, mut output: W, handler: F) -> Result<(), PluginError>
where
    R: Read,
    W: Write,
    F: FnOnce(&ExtensionRequest) -> ExtensionResponse,
{
    let mut buf = Vec::new();
    input.read_to_end(&mut buf)?;
    let request = ExtensionRequest::decode(buf.as_slice())?;

    let response = handler(&request);
    output.write_all(&response.encode_to_vec())?;
    output.flush()?;
    Ok(())
}

/// Entry point for a plugin `main`: serves a single request over stdin/stdout.
///
/// Returns a failing exit code if the exchange itself breaks down; the
/// compiler treats that as a protocol error.
pub fn run<F>(handler: F) -> ExitCode
where
    F: FnOnce(&ExtensionRequest) -> ExtensionResponse,
{
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match run_with_io(stdin.lock(), stdout.lock(), handler) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

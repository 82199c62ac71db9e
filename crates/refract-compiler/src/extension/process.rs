//! Extension handlers backed by external plugin executables.
//!
//! One process is spawned per request. The encoded [`ExtensionRequest`] is
//! written to the plugin's stdin, which is then closed; the plugin writes one
//! encoded [`ExtensionResponse`] to stdout and exits with status 0.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use prost::Message;
use tracing::{debug, warn};

use super::{ExtensionHandler, ExtensionRequest, ExtensionResponse};
use crate::error::CompileError;

#[derive(Debug, Clone)]
pub struct ProcessHandler {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ProcessHandler {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn protocol_error(&self, reason: impl Into<String>) -> CompileError {
        CompileError::ExtensionProtocol {
            handler: self.name.clone(),
            reason: reason.into(),
        }
    }
}

impl ExtensionHandler for ProcessHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, request: &ExtensionRequest) -> Result<ExtensionResponse, CompileError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            self.protocol_error(format!("failed to start '{}': {}", self.program.display(), e))
        })?;

        // Feed stdin from a separate thread so a plugin that writes a large
        // response before draining its input cannot deadlock us.
        let input = request.encode_to_vec();
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || match stdin.write_all(&input) {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|e| self.protocol_error(format!("failed to wait for plugin: {}", e)))?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(handler = %self.name, error = %e, "failed to write request to plugin"),
                Err(_) => warn!(handler = %self.name, "request writer thread panicked"),
            }
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();

        if !output.status.success() {
            let mut reason = match output.status.code() {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            };
            if !stderr.is_empty() {
                reason.push_str(": ");
                reason.push_str(stderr);
            }
            return Err(self.protocol_error(reason));
        }

        if !stderr.is_empty() {
            debug!(handler = %self.name, stderr, "plugin wrote to stderr");
        }

        ExtensionResponse::decode(output.stdout.as_slice())
            .map_err(|e| self.protocol_error(format!("undecodable response: {}", e)))
    }
}

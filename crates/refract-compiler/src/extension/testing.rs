//! In-process handler doubles.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{ExtensionHandler, ExtensionRequest, ExtensionResponse};
use crate::error::CompileError;

/// Answers every request with the same response, or a protocol error.
pub(crate) struct StaticHandler {
    name: String,
    response: Option<ExtensionResponse>,
}

impl StaticHandler {
    pub(crate) fn handled(name: &str, value: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            response: Some(ExtensionResponse::handled(value)),
        }
    }

    pub(crate) fn unhandled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            response: Some(ExtensionResponse::unhandled()),
        }
    }

    pub(crate) fn failed(name: &str, errors: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            response: Some(ExtensionResponse::failed(errors.iter().copied())),
        }
    }

    pub(crate) fn broken(name: &str) -> Self {
        Self {
            name: name.to_string(),
            response: None,
        }
    }
}

impl ExtensionHandler for StaticHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, _request: &ExtensionRequest) -> Result<ExtensionResponse, CompileError> {
        self.response
            .clone()
            .ok_or_else(|| CompileError::ExtensionProtocol {
                handler: self.name.clone(),
                reason: "exited with status 1".into(),
            })
    }
}

/// Wraps another handler and keeps every request it sees.
pub(crate) struct RecordingHandler<H> {
    name: String,
    inner: H,
    calls: Arc<Mutex<Vec<ExtensionRequest>>>,
}

impl<H: ExtensionHandler> RecordingHandler<H> {
    pub(crate) fn new(name: &str, inner: H) -> Self {
        Self {
            name: name.to_string(),
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<ExtensionRequest>>> {
        Arc::clone(&self.calls)
    }
}

impl<H: ExtensionHandler> ExtensionHandler for RecordingHandler<H> {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, request: &ExtensionRequest) -> Result<ExtensionResponse, CompileError> {
        self.calls.lock().push(request.clone());
        self.inner.call(request)
    }
}

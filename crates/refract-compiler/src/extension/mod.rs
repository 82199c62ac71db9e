//! Vendor-extension dispatch.
//!
//! Fields the compiler does not recognise (`x-*`) are offered to each
//! registered [`ExtensionHandler`] in registration order. The first handler
//! that claims the field wins; a handler reporting errors aborts the
//! compilation; if nobody claims it the field stays in raw form.

mod process;

#[cfg(test)]
pub(crate) mod testing;

pub use process::ProcessHandler;
pub use refract_plugin_sdk::{ExtensionRequest, ExtensionResponse, Version, Wrapper};

use std::fmt;

use tracing::debug;

use crate::context::Context;
use crate::error::CompileError;
use crate::node::Node;

/// Dialect version sent to plugins when none is configured.
pub const DEFAULT_DIALECT_VERSION: &str = "v3";

/// Something that can compile extension fields.
///
/// The production implementation is [`ProcessHandler`]; the dispatch loop
/// never depends on how a handler reaches its plugin.
pub trait ExtensionHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Handle one request. Transport failures are reported as
    /// [`CompileError::ExtensionProtocol`].
    fn call(&self, request: &ExtensionRequest) -> Result<ExtensionResponse, CompileError>;
}

/// Terminal, non-error result of offering a field to the handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionOutcome {
    /// A handler claimed the field; `value` is its compiled representation.
    Handled { handler: String, value: Vec<u8> },
    /// No handler claimed the field.
    Unhandled,
}

impl ExtensionOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, ExtensionOutcome::Handled { .. })
    }

    pub fn value(&self) -> Option<&[u8]> {
        match self {
            ExtensionOutcome::Handled { value, .. } => Some(value),
            ExtensionOutcome::Unhandled => None,
        }
    }
}

/// Ordered, read-only-after-start-up set of handlers.
pub struct ExtensionRegistry {
    handlers: Vec<Box<dyn ExtensionHandler>>,
    dialect_version: String,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            dialect_version: DEFAULT_DIALECT_VERSION.to_string(),
        }
    }

    pub(crate) const fn empty() -> Self {
        Self {
            handlers: Vec::new(),
            dialect_version: String::new(),
        }
    }

    /// Set the dialect version reported in each request's wrapper.
    pub fn with_dialect_version(mut self, version: impl Into<String>) -> Self {
        self.dialect_version = version.into();
        self
    }

    /// Append a handler; it is consulted after every handler registered before it.
    pub fn register(&mut self, handler: impl ExtensionHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn dialect_version(&self) -> &str {
        &self.dialect_version
    }

    /// Run the dispatch loop for one extension field.
    pub fn dispatch(
        &self,
        ctx: &Context<'_>,
        name: &str,
        node: &Node,
    ) -> Result<ExtensionOutcome, CompileError> {
        if self.handlers.is_empty() {
            return Ok(ExtensionOutcome::Unhandled);
        }

        let request = self.request(name, node).map_err(|e| e.at(ctx))?;

        for handler in &self.handlers {
            debug!(handler = handler.name(), extension = name, context = %ctx, "dispatching extension");
            let response = handler.call(&request).map_err(|e| e.at(ctx))?;

            if !response.errors.is_empty() {
                return Err(CompileError::Extension {
                    context: ctx.description(),
                    handler: handler.name().to_string(),
                    messages: response.errors,
                });
            }

            if response.handled {
                debug!(handler = handler.name(), extension = name, bytes = response.value.len(), "extension handled");
                return Ok(ExtensionOutcome::Handled {
                    handler: handler.name().to_string(),
                    value: response.value,
                });
            }
        }

        debug!(extension = name, context = %ctx, "extension left unhandled");
        Ok(ExtensionOutcome::Unhandled)
    }

    /// The request never left the compiler; blame the handler that would
    /// have received it first.
    fn render_error(&self, name: &str, err: impl fmt::Display) -> CompileError {
        let handler = self.handlers.first().map(|h| h.name()).unwrap_or_default();
        CompileError::ExtensionProtocol {
            handler: handler.to_string(),
            reason: format!("could not render extension '{}' as YAML: {}", name, err),
        }
    }

    fn request(&self, name: &str, node: &Node) -> Result<ExtensionRequest, CompileError> {
        let yaml = node
            .to_yaml_string()
            .map_err(|e| self.render_error(name, e))?;

        Ok(ExtensionRequest {
            compiler_version: Some(compiler_version()),
            wrapper: Some(Wrapper {
                name: name.to_string(),
                version: self.dialect_version.clone(),
                yaml,
            }),
            extension_name: name.to_string(),
        })
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("handlers", &self.names())
            .field("dialect_version", &self.dialect_version)
            .finish()
    }
}

/// Offer an extension field to the handlers carried by `ctx`.
pub fn dispatch_extension(
    ctx: &Context<'_>,
    name: &str,
    node: &Node,
) -> Result<ExtensionOutcome, CompileError> {
    ctx.dispatch_extension(name, node)
}

/// True for field names outside the core vocabulary.
pub fn is_extension(key: &str) -> bool {
    key.starts_with("x-")
}

/// The compiler's own version as sent to plugins.
pub fn compiler_version() -> Version {
    let version = semver::Version::parse(crate::COMPILER_VERSION)
        .unwrap_or_else(|_| semver::Version::new(0, 0, 0));
    let clamp = |n: u64| i32::try_from(n).unwrap_or(i32::MAX);
    Version {
        major: clamp(version.major),
        minor: clamp(version.minor),
        patch: clamp(version.patch),
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{RecordingHandler, StaticHandler};
    use super::*;

    fn node() -> Node {
        Node::from_yaml_str("title: Dune\nauthor: Herbert\n").unwrap()
    }

    #[test]
    fn handled_response_returns_value() {
        let mut registry = ExtensionRegistry::new();
        registry.register(StaticHandler::handled("books", b"V".to_vec()));
        let ctx = Context::root("$root", &registry);

        let outcome = dispatch_extension(&ctx, "x-book", &node()).unwrap();
        assert_eq!(
            outcome,
            ExtensionOutcome::Handled {
                handler: "books".into(),
                value: b"V".to_vec()
            }
        );
    }

    #[test]
    fn sole_unhandled_handler_is_not_an_error() {
        let mut registry = ExtensionRegistry::new();
        registry.register(StaticHandler::unhandled("books"));
        let ctx = Context::root("$root", &registry);

        let outcome = dispatch_extension(&ctx, "x-book", &node()).unwrap();
        assert_eq!(outcome, ExtensionOutcome::Unhandled);
    }

    #[test]
    fn error_response_is_fatal_with_context_and_handler() {
        let mut registry = ExtensionRegistry::new();
        registry.register(StaticHandler::failed("books", &["missing isbn", "bad year"]));
        let root = Context::root("$root", &registry);
        let info = root.child("info");
        let field = info.child("x-book");

        let err = dispatch_extension(&field, "x-book", &node()).unwrap_err();
        match &err {
            CompileError::Extension {
                context,
                handler,
                messages,
            } => {
                assert_eq!(context, "$root.info.x-book");
                assert_eq!(handler, "books");
                assert_eq!(messages, &vec!["missing isbn".to_string(), "bad year".to_string()]);
            }
            other => panic!("expected Extension error, got {:?}", other),
        }
        assert!(err.to_string().contains("missing isbn; bad year"));
    }

    #[test]
    fn handlers_run_in_registration_order_until_claimed() {
        let first = RecordingHandler::new("first", StaticHandler::unhandled("first"));
        let second = RecordingHandler::new("second", StaticHandler::handled("second", b"2".to_vec()));
        let third = RecordingHandler::new("third", StaticHandler::handled("third", b"3".to_vec()));
        let (c1, c2, c3) = (first.calls(), second.calls(), third.calls());

        let mut registry = ExtensionRegistry::new();
        registry.register(first);
        registry.register(second);
        registry.register(third);
        assert_eq!(registry.names(), vec!["first", "second", "third"]);

        let ctx = Context::root("$root", &registry);
        let outcome = ctx.dispatch_extension("x-book", &node()).unwrap();
        assert_eq!(outcome.value(), Some(&b"2"[..]));
        assert_eq!(c1.lock().len(), 1);
        assert_eq!(c2.lock().len(), 1);
        assert!(c3.lock().is_empty());
    }

    #[test]
    fn request_carries_version_yaml_and_name() {
        let recorder = RecordingHandler::new("rec", StaticHandler::unhandled("rec"));
        let calls = recorder.calls();
        let mut registry = ExtensionRegistry::new().with_dialect_version("v2");
        registry.register(recorder);

        let ctx = Context::root("$root", &registry);
        ctx.dispatch_extension("x-book", &node()).unwrap();

        let calls = calls.lock();
        let request = &calls[0];
        assert_eq!(request.extension_name, "x-book");
        assert_eq!(request.compiler_version, Some(compiler_version()));
        let wrapper = request.wrapper.as_ref().unwrap();
        assert_eq!(wrapper.name, "x-book");
        assert_eq!(wrapper.version, "v2");
        assert_eq!(wrapper.yaml, "title: Dune\nauthor: Herbert\n");
    }

    #[test]
    fn protocol_errors_carry_context() {
        let mut registry = ExtensionRegistry::new();
        registry.register(StaticHandler::broken("crashy"));
        let root = Context::root("$root", &registry);
        let field = root.child("x-thing");

        let err = field.dispatch_extension("x-thing", &Node::from(true)).unwrap_err();
        assert_eq!(err.context(), Some("$root.x-thing"));
        assert!(matches!(err.root_cause(), CompileError::ExtensionProtocol { .. }));
    }

    #[test]
    fn render_failure_names_a_registered_handler() {
        let mut registry = ExtensionRegistry::new();
        registry.register(StaticHandler::unhandled("first"));
        registry.register(StaticHandler::unhandled("second"));

        match registry.render_error("x-book", "unrepresentable value") {
            CompileError::ExtensionProtocol { handler, reason } => {
                assert_eq!(handler, "first");
                assert!(reason.contains("x-book"), "reason: {}", reason);
                assert!(reason.contains("unrepresentable value"), "reason: {}", reason);
            }
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn compiler_version_matches_crate() {
        let v = compiler_version();
        let expected = semver::Version::parse(crate::COMPILER_VERSION).unwrap();
        assert_eq!(v.major as u64, expected.major);
        assert_eq!(v.minor as u64, expected.minor);
        assert_eq!(v.patch as u64, expected.patch);
    }

    #[test]
    fn extension_keys() {
        assert!(is_extension("x-book"));
        assert!(!is_extension("paths"));
        assert!(!is_extension("X-upper"));
    }
}

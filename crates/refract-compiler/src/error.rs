use thiserror::Error;

use crate::context::Context;

/// Errors produced while loading, resolving or compiling documents.
///
/// Every variant is fatal to the enclosing compilation. Use [`CompileError::at`]
/// to attach the location the error occurred at.
#[derive(Debug, Error)]
pub enum CompileError {
    /// E1001: Network fetch failed or returned a non-2xx status.
    #[error("E1001: failed to fetch {locator}: {reason}")]
    Fetch { locator: String, reason: String },

    /// E1002: Local document does not exist.
    #[error("E1002: file not found: {path}")]
    FileNotFound { path: String },

    /// E1003: Document is not valid YAML/JSON.
    #[error("E1003: parse error in {locator}{}: {message}", position_suffix(.line, .column))]
    Parse {
        locator: String,
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    /// E1004: A `$ref` fragment names a path that does not exist.
    #[error("E1004: unresolved $ref '{reference}': nothing at '{segment}'")]
    UnresolvedReference { reference: String, segment: String },

    /// E1005: An extension handler reported errors.
    #[error("E1005: extension handler '{handler}' failed at {context}: {}", .messages.join("; "))]
    Extension {
        context: String,
        handler: String,
        messages: Vec<String>,
    },

    /// E1006: An extension handler crashed or produced undecodable output.
    #[error("E1006: extension handler '{handler}' protocol error: {reason}")]
    ExtensionProtocol { handler: String, reason: String },

    /// E1007: A `$ref` chain loops back on itself.
    #[error("E1007: circular $ref detected: {reference}")]
    CircularReference { reference: String },

    /// E1008: A `$ref` chain is deeper than the configured limit.
    #[error("E1008: $ref chain deeper than {limit} at '{reference}'")]
    ReferenceDepthExceeded { reference: String, limit: usize },

    /// E1009: A locator cannot be interpreted as a path or URL.
    #[error("E1009: invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// E1010: Project manifest parsing or loading error.
    #[error("E1010: manifest error: {0}")]
    Manifest(String),

    /// I/O error other than a missing file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// An error annotated with the context description it occurred at.
    #[error("{context}: {source}")]
    At {
        context: String,
        source: Box<CompileError>,
    },
}

impl CompileError {
    /// Attach the description of `ctx`, unless the error already carries a location.
    pub fn at(self, ctx: &Context<'_>) -> Self {
        if self.context().is_some() {
            return self;
        }
        CompileError::At {
            context: ctx.description(),
            source: Box::new(self),
        }
    }

    /// The context description carried by this error, if any.
    pub fn context(&self) -> Option<&str> {
        match self {
            CompileError::At { context, .. } | CompileError::Extension { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// The underlying error with any location annotation stripped.
    pub fn root_cause(&self) -> &CompileError {
        match self {
            CompileError::At { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn position_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {} column {}", line, column),
        (Some(line), None) => format!(" at line {}", line),
        _ => String::new(),
    }
}

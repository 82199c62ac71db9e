//! Loads structured documents, resolves cross-document `$ref`s and hands
//! vendor-extension fields to out-of-process plugins.
//!
//! The pieces are usable on their own by format-specific model builders
//! ([`source`], [`resolver`], [`context`], [`extension`]); [`compile`] ties
//! them into a depth-first document walk driven by a [`manifest`].

pub mod compile;
pub mod context;
pub mod error;
pub mod extension;
pub mod locator;
pub mod manifest;
pub mod node;
pub mod resolver;
pub mod source;

pub use compile::{compile, CompileOptions, CompiledDocument, CompiledExtension, Compiler};
pub use context::Context;
pub use error::CompileError;
pub use extension::{
    compiler_version, dispatch_extension, ExtensionHandler, ExtensionOutcome, ExtensionRegistry,
    ProcessHandler,
};
pub use locator::Locator;
pub use manifest::{find_manifest, ExtensionDecl, ProjectManifest, MANIFEST_FILE_NAME};
pub use node::{Node, Scalar};
pub use resolver::{ReferenceResolver, Resolved};
pub use source::{DocumentSource, FsHttpSource, MemorySource};

/// Compiler version (from Cargo.toml).
pub const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

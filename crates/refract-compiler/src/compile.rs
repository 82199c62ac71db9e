//! Depth-first document compilation.
//!
//! Walks a loaded document, follows `$ref`s when asked to inline them, and
//! offers every `x-*` field to the registered extension handlers. The walk
//! owns cycle detection: the resolver happily returns a fragment that refers
//! back to itself, so the compiler keeps the chain of references it is
//! currently inside and fails if one repeats.

use tracing::{debug, info};

use crate::context::Context;
use crate::error::CompileError;
use crate::extension::{is_extension, ExtensionOutcome, ExtensionRegistry};
use crate::locator::Locator;
use crate::node::Node;
use crate::resolver::{split_reference, ReferenceResolver};
use crate::source::{DocumentSource, FsHttpSource};

/// Options controlling a compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Replace `{$ref: ...}` mappings with the node they designate.
    pub inline_refs: bool,
    /// Maximum number of nested `$ref`s followed (default: 64).
    pub max_ref_depth: usize,
    /// Name of the root context (default: `$root`).
    pub root_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            inline_refs: false,
            max_ref_depth: 64,
            root_name: "$root".to_string(),
        }
    }
}

/// An extension field a handler claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledExtension {
    /// Description of the context the field was found at.
    pub context: String,
    pub name: String,
    pub handler: String,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CompiledDocument {
    pub locator: Locator,
    /// The document tree. Extension fields keep their raw value here; the
    /// compiled forms are listed in `extensions`.
    pub root: Node,
    pub extensions: Vec<CompiledExtension>,
    /// Number of `$ref`s that were inlined.
    pub references: usize,
}

impl CompiledDocument {
    /// Compiled value of the extension at `context`, if one was handled there.
    pub fn extension_at(&self, context: &str) -> Option<&CompiledExtension> {
        self.extensions.iter().find(|e| e.context == context)
    }
}

pub struct Compiler<'r, S = FsHttpSource> {
    resolver: &'r ReferenceResolver<S>,
    registry: &'r ExtensionRegistry,
    options: CompileOptions,
}

#[derive(Default)]
struct Walk {
    /// References currently being expanded, as (document, fragment).
    active: Vec<(Locator, String)>,
    extensions: Vec<CompiledExtension>,
    references: usize,
}

impl<'r, S: DocumentSource> Compiler<'r, S> {
    pub fn new(resolver: &'r ReferenceResolver<S>, registry: &'r ExtensionRegistry) -> Self {
        Self::with_options(resolver, registry, CompileOptions::default())
    }

    pub fn with_options(
        resolver: &'r ReferenceResolver<S>,
        registry: &'r ExtensionRegistry,
        options: CompileOptions,
    ) -> Self {
        Self {
            resolver,
            registry,
            options,
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile the document at `locator`.
    pub fn compile(&self, locator: &Locator) -> Result<CompiledDocument, CompileError> {
        info!(locator = %locator, inline_refs = self.options.inline_refs, "compiling document");

        let root_ctx = Context::root(self.options.root_name.clone(), self.registry);
        let document = self.resolver.load(locator).map_err(|e| e.at(&root_ctx))?;

        let mut walk = Walk::default();
        let root = self.visit(&document, locator, &root_ctx, &mut walk)?;

        info!(
            locator = %locator,
            extensions = walk.extensions.len(),
            references = walk.references,
            "document compiled"
        );

        Ok(CompiledDocument {
            locator: locator.clone(),
            root,
            extensions: walk.extensions,
            references: walk.references,
        })
    }

    fn visit(
        &self,
        node: &Node,
        base: &Locator,
        ctx: &Context<'_>,
        walk: &mut Walk,
    ) -> Result<Node, CompileError> {
        match node {
            Node::Scalar(_) => Ok(node.clone()),
            Node::Sequence(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let child = ctx.child(index.to_string());
                    out.push(self.visit(item, base, &child, walk)?);
                }
                Ok(Node::Sequence(out))
            }
            Node::Mapping(entries) => {
                if self.options.inline_refs {
                    if let Some(reference) = node.reference() {
                        // Extensions beside a `$ref` are dispatched as in the
                        // non-inlined walk and carried onto the inlined node.
                        let siblings: Vec<&(String, Node)> =
                            entries.iter().filter(|(key, _)| is_extension(key)).collect();
                        for (key, value) in &siblings {
                            let child = ctx.child(key.as_str());
                            self.dispatch(key, value, &child, walk)?;
                        }
                        let inlined = self.inline(reference, base, ctx, walk)?;
                        return Ok(merge_siblings(inlined, siblings));
                    }
                }

                let mut out = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let child = ctx.child(key.as_str());
                    if is_extension(key) {
                        self.dispatch(key, value, &child, walk)?;
                        out.push((key.clone(), value.clone()));
                    } else {
                        out.push((key.clone(), self.visit(value, base, &child, walk)?));
                    }
                }
                Ok(Node::Mapping(out))
            }
        }
    }

    fn inline(
        &self,
        reference: &str,
        base: &Locator,
        ctx: &Context<'_>,
        walk: &mut Walk,
    ) -> Result<Node, CompileError> {
        if walk.active.len() >= self.options.max_ref_depth {
            return Err(CompileError::ReferenceDepthExceeded {
                reference: reference.to_string(),
                limit: self.options.max_ref_depth,
            }
            .at(ctx));
        }

        let resolved = self
            .resolver
            .resolve_target(base, reference)
            .map_err(|e| e.at(ctx))?;

        let key = (resolved.locator.clone(), normalize_fragment(split_reference(reference).1));
        if walk.active.contains(&key) {
            return Err(CompileError::CircularReference {
                reference: reference.to_string(),
            }
            .at(ctx));
        }

        debug!(reference, target = %resolved.locator, context = %ctx, "inlining $ref");
        walk.active.push(key);
        let result = self.visit(&resolved.node, &resolved.locator, ctx, walk);
        walk.active.pop();

        walk.references += 1;
        result
    }

    fn dispatch(
        &self,
        name: &str,
        value: &Node,
        ctx: &Context<'_>,
        walk: &mut Walk,
    ) -> Result<(), CompileError> {
        match ctx.dispatch_extension(name, value)? {
            ExtensionOutcome::Handled { handler, value } => {
                walk.extensions.push(CompiledExtension {
                    context: ctx.description(),
                    name: name.to_string(),
                    handler,
                    value,
                });
            }
            ExtensionOutcome::Unhandled => {}
        }
        Ok(())
    }
}

/// Compile `locator` with default options.
pub fn compile<S: DocumentSource>(
    resolver: &ReferenceResolver<S>,
    registry: &ExtensionRegistry,
    locator: &Locator,
) -> Result<CompiledDocument, CompileError> {
    Compiler::new(resolver, registry).compile(locator)
}

/// Append sibling extensions to an inlined mapping, unless the target already
/// defines the same key. Non-mapping targets are returned unchanged.
fn merge_siblings(inlined: Node, siblings: Vec<&(String, Node)>) -> Node {
    match inlined {
        Node::Mapping(mut entries) => {
            for (key, value) in siblings {
                if !entries.iter().any(|(k, _)| k == key) {
                    entries.push((key.clone(), value.clone()));
                }
            }
            Node::Mapping(entries)
        }
        other => other,
    }
}

/// `/a/b` and `a/b` designate the same node.
fn normalize_fragment(fragment: &str) -> String {
    fragment.strip_prefix('/').unwrap_or(fragment).to_string()
}

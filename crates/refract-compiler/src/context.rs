//! Location breadcrumbs for recursive model construction.
//!
//! A [`Context`] borrows its parent, so a chain lives exactly as long as the
//! descent that built it. Each context also carries the extension handlers
//! registered for the run, inherited unchanged from parent to child.

use std::fmt;

use crate::error::CompileError;
use crate::extension::{ExtensionOutcome, ExtensionRegistry};
use crate::node::Node;

static NO_EXTENSIONS: ExtensionRegistry = ExtensionRegistry::empty();

pub struct Context<'a> {
    name: String,
    parent: Option<&'a Context<'a>>,
    extensions: &'a ExtensionRegistry,
}

impl<'a> Context<'a> {
    /// A context named `name` below `parent`. Handlers are inherited from the
    /// parent; a parentless context has none.
    pub fn new(name: impl Into<String>, parent: Option<&'a Context<'a>>) -> Self {
        Self {
            name: name.into(),
            parent,
            extensions: parent.map(|p| p.extensions).unwrap_or(&NO_EXTENSIONS),
        }
    }

    /// A root context carrying the run's extension handlers.
    pub fn root(name: impl Into<String>, extensions: &'a ExtensionRegistry) -> Self {
        Self {
            name: name.into(),
            parent: None,
            extensions,
        }
    }

    pub fn child(&self, name: impl Into<String>) -> Context<'_> {
        Context::new(name, Some(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&'a Context<'a>> {
        self.parent
    }

    pub fn extensions(&self) -> &'a ExtensionRegistry {
        self.extensions
    }

    /// Number of ancestors; zero at the root.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent, |c| c.parent).count()
    }

    /// Dotted path from the root, e.g. `$root.paths./pets.get.parameters.0`.
    pub fn description(&self) -> String {
        let mut names: Vec<&str> = std::iter::successors(Some(self), |c| c.parent)
            .map(|c| c.name.as_str())
            .collect();
        names.reverse();
        names.join(".")
    }

    /// Offer the extension field `name` with raw value `node` to this
    /// context's handlers.
    pub fn dispatch_extension(&self, name: &str, node: &Node) -> Result<ExtensionOutcome, CompileError> {
        self.extensions.dispatch(self, name, node)
    }
}

impl fmt::Display for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("description", &self.description())
            .field("extensions", &self.extensions)
            .finish()
    }
}

//! Cross-document `$ref` resolution.
//!
//! A reference has the form `[locator]#[/segment/segment...]`. The locator
//! part is resolved against the directory of the base document; an empty
//! locator means the base document itself. The fragment is walked from the
//! document root, one JSON-pointer segment at a time.
//!
//! The resolver owns two caches, neither ever evicted: parsed documents keyed
//! by normalised locator, and resolved fragments keyed by
//! `(normalised locator, fragment)`. Cycles are not detected here; the
//! resolver only returns data. See [`crate::compile`] for cycle handling.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::error::CompileError;
use crate::locator::Locator;
use crate::node::Node;
use crate::source::{DocumentSource, FsHttpSource};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FragmentKey {
    locator: Locator,
    fragment: String,
}

/// A resolved reference together with the document it was found in.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Normalised locator of the document holding the fragment. Nested
    /// references inside `node` are relative to this document.
    pub locator: Locator,
    /// The fragment text after `#`, possibly empty.
    pub fragment: String,
    pub node: Arc<Node>,
}

pub struct ReferenceResolver<S = FsHttpSource> {
    source: S,
    documents: Mutex<HashMap<Locator, Arc<Node>>>,
    fragments: Mutex<HashMap<FragmentKey, Arc<Node>>>,
}

impl ReferenceResolver<FsHttpSource> {
    /// A resolver reading from the filesystem and the network.
    pub fn new() -> Self {
        Self::with_source(FsHttpSource::new())
    }
}

impl Default for ReferenceResolver<FsHttpSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DocumentSource> ReferenceResolver<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            documents: Mutex::new(HashMap::new()),
            fragments: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Load a whole document, reading it at most once per resolver.
    pub fn load(&self, locator: &Locator) -> Result<Arc<Node>, CompileError> {
        if let Some(doc) = self.documents.lock().get(locator) {
            return Ok(Arc::clone(doc));
        }

        // Not holding the lock across I/O; a racing loader loses to the first insert.
        let doc = Arc::new(self.source.load(locator)?);
        debug!(locator = %locator, "document cached");
        let mut documents = self.documents.lock();
        Ok(Arc::clone(documents.entry(locator.clone()).or_insert(doc)))
    }

    /// Resolve `reference` against the root of the document at `base`.
    pub fn resolve(&self, base: &Locator, reference: &str) -> Result<Arc<Node>, CompileError> {
        self.resolve_target(base, reference).map(|r| r.node)
    }

    /// Like [`ReferenceResolver::resolve`], also reporting which document the
    /// fragment came from.
    pub fn resolve_target(&self, base: &Locator, reference: &str) -> Result<Resolved, CompileError> {
        let (document, fragment) = split_reference(reference);
        let locator = if document.is_empty() {
            base.clone()
        } else {
            base.join(document)?
        };

        let key = FragmentKey {
            locator,
            fragment: fragment.to_string(),
        };

        if let Some(node) = self.fragments.lock().get(&key) {
            debug!(locator = %key.locator, fragment, "$ref cache hit");
            return Ok(Resolved {
                locator: key.locator,
                fragment: key.fragment,
                node: Arc::clone(node),
            });
        }

        let doc = self.load(&key.locator)?;
        let node = if pointer_segments(fragment).next().is_none() {
            doc
        } else {
            Arc::new(walk(&doc, fragment, reference)?.clone())
        };

        debug!(locator = %key.locator, fragment, "$ref resolved");
        let node = Arc::clone(
            self.fragments
                .lock()
                .entry(key.clone())
                .or_insert(node),
        );

        Ok(Resolved {
            locator: key.locator,
            fragment: key.fragment,
            node,
        })
    }

    /// Number of whole documents held in the cache.
    pub fn cached_documents(&self) -> usize {
        self.documents.lock().len()
    }

    /// Number of resolved fragments held in the cache.
    pub fn cached_fragments(&self) -> usize {
        self.fragments.lock().len()
    }
}

/// Split a reference on its first `#` into document and fragment parts.
pub fn split_reference(reference: &str) -> (&str, &str) {
    reference.split_once('#').unwrap_or((reference, ""))
}

/// Raw (still escaped) segments of a fragment. `/a/b` and `a/b` are the same
/// path; an empty fragment or a lone `/` has no segments.
fn pointer_segments(fragment: &str) -> impl Iterator<Item = &str> {
    let path = fragment.strip_prefix('/').unwrap_or(fragment);
    path.split('/').filter(move |_| !path.is_empty())
}

/// Undo JSON-pointer (`~1`, `~0`) and percent escaping in one segment.
pub fn decode_segment(segment: &str) -> String {
    let unescaped = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&unescaped)
        .decode_utf8_lossy()
        .into_owned()
}

fn walk<'a>(root: &'a Node, fragment: &str, reference: &str) -> Result<&'a Node, CompileError> {
    let mut current = root;
    let mut walked: Vec<&str> = Vec::new();
    for raw in pointer_segments(fragment) {
        walked.push(raw);
        current = current
            .child(&decode_segment(raw))
            .ok_or_else(|| CompileError::UnresolvedReference {
                reference: reference.to_string(),
                segment: walked.join("/"),
            })?;
    }
    Ok(current)
}

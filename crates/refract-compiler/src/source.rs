//! Turning locators into parsed documents.
//!
//! Loaders are stateless: every call reads or fetches again. Caching belongs
//! to [`crate::resolver::ReferenceResolver`].

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use reqwest::blocking::Client;

use tracing::debug;
use url::Url;

use crate::error::CompileError;
use crate::locator::Locator;
use crate::node::Node;

/// Something that can produce the parsed document named by a locator.
pub trait DocumentSource {
    fn load(&self, locator: &Locator) -> Result<Node, CompileError>;
}

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    fn load(&self, locator: &Locator) -> Result<Node, CompileError> {
        (**self).load(locator)
    }
}

/// Parse raw document bytes, attributing failures to `locator`.
pub fn parse_document(locator: &Locator, bytes: &[u8]) -> Result<Node, CompileError> {
    let text = std::str::from_utf8(bytes).map_err(|e| CompileError::Parse {
        locator: locator.to_string(),
        message: format!("document is not valid UTF-8: {}", e),
        line: None,
        column: None,
    })?;

    Node::from_yaml_str(text).map_err(|e| {
        let location = e.location();
        CompileError::Parse {
            locator: locator.to_string(),
            message: e.to_string(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
        }
    })
}

/// Reads local files and fetches `http(s)` URLs. Exactly one attempt per call.
///
/// The HTTP client is built on the first fetch and reused afterwards, so a
/// source that only ever reads files never starts one.
#[derive(Debug, Clone, Default)]
pub struct FsHttpSource {
    user_agent: Option<String>,
    client: OnceLock<Client>,
}

impl FsHttpSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the `User-Agent` header sent on fetches.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self.client = OnceLock::new();
        self
    }

    fn client(&self) -> Result<&Client, reqwest::Error> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("refract/{}", crate::COMPILER_VERSION));
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(self.client.get_or_init(|| client))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, CompileError> {
        debug!(path = %path.display(), "reading document");
        std::fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CompileError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => CompileError::Io {
                path: path.display().to_string(),
                source: e,
            },
        })
    }

    fn fetch(&self, url: &Url) -> Result<Vec<u8>, CompileError> {
        let fail = |reason: String| CompileError::Fetch {
            locator: url.to_string(),
            reason,
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(fail(format!("unsupported scheme '{}'", url.scheme())));
        }

        debug!(url = %url, "fetching document");
        let response = self
            .client()
            .map_err(|e| fail(e.to_string()))?
            .get(url.clone())
            .send()
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status)));
        }

        let body = response.bytes().map_err(|e| fail(e.to_string()))?;
        debug!(url = %url, bytes = body.len(), "fetched document");
        Ok(body.to_vec())
    }
}

impl DocumentSource for FsHttpSource {
    fn load(&self, locator: &Locator) -> Result<Node, CompileError> {
        let bytes = match locator {
            Locator::Path(path) => self.read_file(path)?,
            Locator::Url(url) => self.fetch(url)?,
        };
        parse_document(locator, &bytes)
    }
}

/// Serves documents from memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: HashMap<Locator, String>,
    loads: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `text` under `locator`.
    pub fn insert(&mut self, locator: &str, text: impl Into<String>) -> Result<Locator, CompileError> {
        let locator = Locator::parse(locator)?;
        self.documents.insert(locator.clone(), text.into());
        Ok(locator)
    }

    /// Builder form of [`MemorySource::insert`] for literal fixtures.
    ///
    /// # Panics
    ///
    /// Panics if `locator` cannot be parsed.
    #[allow(clippy::panic)]
    pub fn with(mut self, locator: &str, text: impl Into<String>) -> Self {
        let parsed = Locator::parse(locator)
            .unwrap_or_else(|e| panic!("invalid fixture locator '{}': {}", locator, e));
        self.documents.insert(parsed, text.into());
        self
    }

    /// Number of `load` calls served so far, including failed ones.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl DocumentSource for MemorySource {
    fn load(&self, locator: &Locator) -> Result<Node, CompileError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        match self.documents.get(locator) {
            Some(text) => parse_document(locator, text.as_bytes()),
            None => Err(CompileError::FileNotFound {
                path: locator.to_string(),
            }),
        }
    }
}

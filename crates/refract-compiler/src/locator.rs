//! Document identity.
//!
//! A [`Locator`] is the canonical name of a document: an absolute,
//! lexically normalised filesystem path or a parsed URL. Two references
//! that reach the same document through different relative paths produce
//! equal locators, which is what makes them safe to use as cache keys.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use url::Url;

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Locator {
    Path(PathBuf),
    Url(Url),
}

impl Locator {
    /// Interpret `input` as a URL if it carries a scheme, otherwise as a path
    /// relative to the current working directory.
    pub fn parse(input: &str) -> Result<Self, CompileError> {
        if input.is_empty() {
            return Err(invalid(input, "locator is empty"));
        }
        if has_scheme(input) {
            let url = Url::parse(input).map_err(|e| invalid(input, e))?;
            return Self::from_url(url, input);
        }
        Self::from_path(input)
    }

    /// Build a locator from a filesystem path, made absolute against the
    /// current working directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CompileError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let cwd = std::env::current_dir().map_err(|e| CompileError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            cwd.join(path)
        };
        Ok(Locator::Path(normalize_path(&absolute)))
    }

    fn from_url(url: Url, input: &str) -> Result<Self, CompileError> {
        if url.scheme() == "file" {
            return url
                .to_file_path()
                .map(|p| Locator::Path(normalize_path(&p)))
                .map_err(|()| invalid(input, "file URL has no local path"));
        }
        Ok(Locator::Url(url))
    }

    /// Resolve `reference` (a path or URL, without fragment) relative to the
    /// directory of this document.
    pub fn join(&self, reference: &str) -> Result<Locator, CompileError> {
        if has_scheme(reference) {
            return Locator::parse(reference);
        }
        match self {
            Locator::Path(base) => {
                let target = Path::new(reference);
                let joined = if target.is_absolute() {
                    target.to_path_buf()
                } else {
                    base.parent().unwrap_or_else(|| Path::new("/")).join(target)
                };
                Ok(Locator::Path(normalize_path(&joined)))
            }
            Locator::Url(base) => {
                let url = base.join(reference).map_err(|e| invalid(reference, e))?;
                Self::from_url(url, reference)
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Locator::Url(_))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Locator::Path(p) => Some(p),
            Locator::Url(_) => None,
        }
    }

    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Locator::Url(u) => Some(u),
            Locator::Path(_) => None,
        }
    }
}

impl FromStr for Locator {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Path(p) => write!(f, "{}", p.display()),
            Locator::Url(u) => f.write_str(u.as_str()),
        }
    }
}

/// True for `scheme://...`. A bare drive letter (`C:\`) is not a scheme.
fn has_scheme(input: &str) -> bool {
    match input.split_once("://") {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Fold `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn invalid(locator: &str, reason: impl fmt::Display) -> CompileError {
    CompileError::InvalidLocator {
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
}

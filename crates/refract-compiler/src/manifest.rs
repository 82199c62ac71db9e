//! Project manifest (`refract.yaml`) parser.
//!
//! The manifest declares the extension handlers available to a compilation,
//! in the order they are consulted, plus defaults for compile options.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compile::CompileOptions;
use crate::error::CompileError;
use crate::extension::{ExtensionRegistry, ProcessHandler, DEFAULT_DIALECT_VERSION};

/// File name looked up next to a document when no manifest is given.
pub const MANIFEST_FILE_NAME: &str = "refract.yaml";

/// A project manifest (`refract.yaml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    /// Dialect version reported to plugins (default: `v3`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_refs: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ref_depth: Option<usize>,

    /// Extension handlers, in registration order.
    #[serde(default)]
    pub extensions: Vec<ExtensionDecl>,
}

/// One extension handler declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionDecl {
    pub name: String,
    /// Executable to run. Paths containing a separator are relative to the
    /// manifest directory; bare names are looked up on `PATH`.
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl ExtensionDecl {
    fn program(&self, base_path: &Path) -> PathBuf {
        let command = Path::new(&self.command);
        if command.is_absolute() || command.components().count() == 1 {
            command.to_path_buf()
        } else {
            base_path.join(command)
        }
    }
}

impl ProjectManifest {
    /// Load a manifest from a YAML file.
    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompileError::Manifest(format!("failed to read {}: {}", path.display(), e))
        })?;

        Self::parse(&content, path)
    }

    /// Parse a manifest from YAML content.
    pub fn parse(content: &str, path: &Path) -> Result<Self, CompileError> {
        let manifest: Self = serde_yaml::from_str(content).map_err(|e| {
            CompileError::Manifest(format!("failed to parse {}: {}", path.display(), e))
        })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<(), CompileError> {
        let mut seen = HashSet::new();
        for decl in &self.extensions {
            if decl.name.trim().is_empty() {
                return Err(CompileError::Manifest(format!(
                    "{}: extension handler with empty name",
                    path.display()
                )));
            }
            if !seen.insert(decl.name.as_str()) {
                return Err(CompileError::Manifest(format!(
                    "{}: extension handler '{}' declared twice",
                    path.display(),
                    decl.name
                )));
            }
        }
        if self.max_ref_depth == Some(0) {
            return Err(CompileError::Manifest(format!(
                "{}: max_ref_depth must be at least 1",
                path.display()
            )));
        }
        Ok(())
    }

    /// Check if an extension handler is declared in the manifest.
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e.name == name)
    }

    /// Declared handler names in registration order.
    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn dialect_version(&self) -> &str {
        self.dialect_version.as_deref().unwrap_or(DEFAULT_DIALECT_VERSION)
    }

    /// Build the handler registry. Relative commands and the plugins' working
    /// directory are resolved against `base_path`.
    pub fn build_registry(&self, base_path: &Path) -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new().with_dialect_version(self.dialect_version());
        for decl in &self.extensions {
            registry.register(
                ProcessHandler::new(decl.name.clone(), decl.program(base_path))
                    .with_args(decl.args.iter().cloned())
                    .with_working_dir(base_path),
            );
        }
        registry
    }

    /// Compile options with the manifest's overrides applied to `base`.
    pub fn compile_options(&self, base: CompileOptions) -> CompileOptions {
        CompileOptions {
            inline_refs: self.inline_refs.unwrap_or(base.inline_refs),
            max_ref_depth: self.max_ref_depth.unwrap_or(base.max_ref_depth),
            ..base
        }
    }
}

/// Find `refract.yaml` in `dir`, if present.
pub fn find_manifest(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(MANIFEST_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

//! Rendering document trees for stdout or a file.

use std::io::Write;
use std::path::Path;

use clap::ValueEnum;
use refract_compiler::{CompiledDocument, Node};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Render `node` in `format`. The result always ends with a newline.
pub fn render(node: &Node, format: OutputFormat) -> Result<String, RenderError> {
    match format {
        OutputFormat::Yaml => Ok(node.to_yaml_string()?),
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(node)?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// Write `rendered` to `path`, or to stdout when no path is given.
pub fn emit(rendered: &str, path: Option<&Path>) -> Result<(), RenderError> {
    match path {
        Some(path) => std::fs::write(path, rendered).map_err(|source| RenderError::Write {
            path: path.display().to_string(),
            source,
        }),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|source| RenderError::Write {
                    path: "<stdout>".to_string(),
                    source,
                })
        }
    }
}

/// One-line-per-extension summary printed after a compile.
pub fn summary(doc: &CompiledDocument) -> String {
    let mut out = format!(
        "compiled {}: {} extension(s) handled, {} $ref(s) inlined\n",
        doc.locator,
        doc.extensions.len(),
        doc.references
    );
    for ext in &doc.extensions {
        out.push_str(&format!(
            "  {} -> {} ({} bytes)\n",
            ext.context,
            ext.handler,
            ext.value.len()
        ));
    }
    out
}

//! The `compile` and `resolve` subcommands.

use std::path::{Path, PathBuf};

use clap::Args;
use refract_compiler::{
    find_manifest, CompileError, CompileOptions, CompiledDocument, Compiler, ExtensionRegistry,
    Locator, ProjectManifest, ReferenceResolver,
};
use refract_telemetry::{log_compile_failed, log_compile_finished, log_compile_started, log_reference_resolved};
use thiserror::Error;

use crate::output::{self, OutputFormat, RenderError};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Root document: a file path or an http(s) URL.
    #[arg(short, long)]
    pub spec: String,

    /// Project manifest. Defaults to `refract.yaml` next to a local document.
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Replace `$ref` mappings with the nodes they designate.
    #[arg(long)]
    pub inline_refs: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Write the document here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Document the reference is relative to.
    #[arg(long)]
    pub base: String,

    /// Reference, e.g. `shared.yaml#/definitions/Pet`.
    #[arg(long = "ref")]
    pub reference: String,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Compile one document and write it out. The summary goes to stderr.
pub fn run_compile(args: &CompileArgs) -> Result<CompiledDocument, CommandError> {
    let locator = Locator::parse(&args.spec)?;
    let (manifest, base_path) = load_manifest(args.manifest.as_deref(), &locator)?;

    let mut options = manifest.compile_options(CompileOptions::default());
    if args.inline_refs {
        options.inline_refs = true;
    }
    let registry = manifest.build_registry(&base_path);

    log_compile_started!(
        locator = %locator,
        handlers = registry.len(),
        inline_refs = options.inline_refs
    );

    let doc = match compile_document(&locator, &registry, options) {
        Ok(doc) => doc,
        Err(e) => {
            log_compile_failed!(locator = %locator, error = %e);
            return Err(e.into());
        }
    };

    let rendered = output::render(&doc.root, args.format)?;
    output::emit(&rendered, args.output.as_deref())?;
    eprint!("{}", output::summary(&doc));

    log_compile_finished!(
        locator = %locator,
        extensions = doc.extensions.len(),
        references = doc.references
    );
    Ok(doc)
}

fn compile_document(
    locator: &Locator,
    registry: &ExtensionRegistry,
    options: CompileOptions,
) -> Result<CompiledDocument, CompileError> {
    let resolver = ReferenceResolver::new();
    Compiler::with_options(&resolver, registry, options).compile(locator)
}

/// The manifest to use and the directory relative commands resolve against.
fn load_manifest(
    explicit: Option<&Path>,
    locator: &Locator,
) -> Result<(ProjectManifest, PathBuf), CompileError> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => locator
            .as_path()
            .and_then(Path::parent)
            .and_then(find_manifest),
    };

    match path {
        Some(path) => {
            let manifest = ProjectManifest::load(&path)?;
            let base = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            tracing::debug!(manifest = %path.display(), handlers = manifest.extensions.len(), "manifest loaded");
            Ok((manifest, base))
        }
        None => Ok((ProjectManifest::default(), PathBuf::from("."))),
    }
}

/// Resolve one reference and print the fragment to stdout.
pub fn run_resolve(args: &ResolveArgs) -> Result<(), CommandError> {
    let base = Locator::parse(&args.base)?;
    let resolver = ReferenceResolver::new();
    let resolved = resolver.resolve_target(&base, &args.reference)?;

    log_reference_resolved!(
        base = %base,
        reference = %args.reference,
        document = %resolved.locator
    );

    let rendered = output::render(&resolved.node, args.format)?;
    output::emit(&rendered, None)?;
    Ok(())
}

//! refract command-line tool.
//!
//! Compiles API description documents, inlining `$ref`s and delegating
//! vendor extensions to plugins declared in `refract.yaml`.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use refract_lib::commands::{run_compile, run_resolve};
use refract_lib::{CompileArgs, ResolveArgs};
use refract_telemetry::{init_logging, LogFormat, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "refract", about = "Compile API description documents", version)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, env = "REFRACT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log format (json or pretty).
    #[arg(long, global = true, env = "REFRACT_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a document, dispatching extension fields to plugins.
    Compile(CompileArgs),

    /// Resolve a single `$ref` and print the fragment.
    Resolve(ResolveArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(log_format) = LogFormat::parse(&cli.log_format) else {
        eprintln!("error: invalid log format '{}' (expected json or pretty)", cli.log_format);
        return ExitCode::from(2);
    };
    let config = TelemetryConfig::new()
        .with_log_level(cli.log_level.clone())
        .with_log_format(log_format);
    if let Err(e) = init_logging(&config) {
        eprintln!("warning: {}", e);
    }

    let result = match &cli.command {
        Commands::Compile(args) => run_compile(args).map(|_| ()),
        Commands::Resolve(args) => run_resolve(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

//! Library half of the `refract` command-line tool.
//!
//! Kept separate from `main.rs` so rendering and command plumbing can be
//! unit tested without spawning the binary.

pub mod commands;
pub mod output;

pub use commands::{CompileArgs, ResolveArgs};
pub use output::{emit, render, summary, OutputFormat, RenderError};

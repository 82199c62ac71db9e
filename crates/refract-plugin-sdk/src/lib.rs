//! SDK for building refract extension-handler plugins.
//!
//! A plugin is an executable that reads one protobuf `ExtensionRequest`
//! from stdin, and writes one `ExtensionResponse` to stdout.
//!
//! # Example
//!
//! ```no_run
//! use refract_plugin_sdk::prelude::*;
//!
//! fn main() -> std::process::ExitCode {
//!     run(|req| {
//!         if req.extension_name == "x-book" {
//!             ExtensionResponse::handled(req.yaml().as_bytes().to_vec())
//!         } else {
//!             ExtensionResponse::unhandled()
//!         }
//!     })
//! }
//! ```

pub mod runner;
pub mod types;

pub use runner::{run, run_with_io, PluginError};
pub use types::{ExtensionRequest, ExtensionResponse, Version, Wrapper};

pub mod prelude {
    pub use crate::runner::run;
    pub use crate::types::*;
}

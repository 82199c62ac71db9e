//! Sample extension plugin used by the CLI regression tests.

use std::process::ExitCode;

use refract_plugin_sdk::prelude::*;
use refract_test::sample;

fn main() -> ExitCode {
    run(|req| match req.extension_name.as_str() {
        sample::ECHO => ExtensionResponse::handled(req.yaml().to_uppercase().into_bytes()),
        sample::FAIL => ExtensionResponse::failed([format!(
            "{} rejected by sample plugin",
            req.extension_name
        )]),
        sample::CRASH => {
            eprintln!("sample plugin: crash requested");
            std::process::exit(3);
        }
        _ => ExtensionResponse::unhandled(),
    })
}

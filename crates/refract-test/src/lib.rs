//! Test harnesses for the refract compiler.
//!
//! Ships `refract-ext-sample`, a small extension plugin built on the SDK, and
//! CLI regression tests that drive the `refract` binary against the shared
//! fixtures in `tests/fixtures`.

#[cfg(test)]
pub mod cli;

/// Extension names understood by `refract-ext-sample`.
pub mod sample {
    /// Handled; the compiled value is the field's YAML, uppercased.
    pub const ECHO: &str = "x-sample-echo";
    /// Answered with an error message.
    pub const FAIL: &str = "x-sample-fail";
    /// The plugin exits non-zero without a response.
    pub const CRASH: &str = "x-sample-crash";
}

//! Protobuf messages exchanged between the compiler and plugin processes.
//!
//! Field numbers are part of the wire contract and must never be reused.

/// Semantic version of the compiler issuing a request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Version {
    #[prost(int32, tag = "1")]
    pub major: i32,
    #[prost(int32, tag = "2")]
    pub minor: i32,
    #[prost(int32, tag = "3")]
    pub patch: i32,
}

/// The named, versioned payload handed to a plugin.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Wrapper {
    /// Name of the extension field (e.g. `x-book`).
    #[prost(string, tag = "1")]
    pub name: String,
    /// Dialect version of the enclosing document (e.g. `v3`).
    #[prost(string, tag = "2")]
    pub version: String,
    /// The raw field value rendered as YAML.
    #[prost(string, tag = "3")]
    pub yaml: String,
}

/// Sent on the plugin's standard input. The plugin reads until EOF.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ExtensionRequest {
    #[prost(message, optional, tag = "1")]
    pub compiler_version: Option<Version>,
    #[prost(message, optional, tag = "2")]
    pub wrapper: Option<Wrapper>,
    #[prost(string, tag = "3")]
    pub extension_name: String,
}

/// Written by the plugin to its standard output before exiting.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ExtensionResponse {
    /// True if the plugin recognised the extension.
    #[prost(bool, tag = "1")]
    pub handled: bool,
    /// Opaque compiled representation of the extension.
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    /// Fatal problems found while handling the extension.
    #[prost(string, repeated, tag = "3")]
    pub errors: Vec<String>,
}

impl ExtensionRequest {
    /// The YAML text of the wrapped value, or an empty string.
    pub fn yaml(&self) -> &str {
        self.wrapper.as_ref().map(|w| w.yaml.as_str()).unwrap_or("")
    }
}

impl ExtensionResponse {
    /// A response claiming the extension with the given compiled value.
    pub fn handled(value: impl Into<Vec<u8>>) -> Self {
        Self {
            handled: true,
            value: value.into(),
            errors: Vec::new(),
        }
    }

    /// A response declining the extension.
    pub fn unhandled() -> Self {
        Self::default()
    }

    /// A response reporting fatal errors for the extension.
    pub fn failed<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            handled: false,
            value: Vec::new(),
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }
}

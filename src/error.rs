//! Error types for mcp-template-server start-up.
//!
//! Errors raised while dispatching capabilities live in
//! [`crate::host::HostError`]; this module only covers loading the
//! configuration before the server starts.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// A setting has an unusable value.
    #[error("invalid setting '{field}': {message}")]
    Invalid {
        /// Dotted path of the setting, e.g. `server.name`.
        field: String,
        /// Description of the validation failure.
        message: String,
    },
}

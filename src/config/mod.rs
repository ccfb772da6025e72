//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk, applying
//! environment overrides and validating the result.
//!
//! # Configuration File Locations
//!
//! 1. Path given as the first CLI argument (must exist)
//! 2. Default location, used only if present:
//!    - **Linux/macOS:** `~/.mcp-template-server/config.json`
//!    - **Windows:** `%USERPROFILE%\.mcp-template-server\config.json`
//!
//! Without any file the built-in defaults apply.
//!
//! # Environment
//!
//! `SERVER_NAME` and `SERVER_VERSION` override the `server` section.

mod settings;

pub use settings::{
    Config, LoggingConfig, ServerConfig, ServerIdentity, DEFAULT_SERVER_DESCRIPTION,
    DEFAULT_SERVER_NAME, DEFAULT_SERVER_VERSION, ENV_SERVER_NAME, ENV_SERVER_VERSION,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.mcp-template-server/`
/// - **Windows:** `%USERPROFILE%\.mcp-template-server\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".mcp-template-server"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads configuration using the process environment for overrides.
///
/// # Errors
///
/// See [`load_config_with_env`].
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Loads configuration, resolving environment overrides through `lookup`.
///
/// If `path` is `None`, the default location is tried and silently skipped
/// when absent.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given file does not exist
/// - The file cannot be read
/// - The JSON is malformed or has unknown fields
/// - A setting fails validation
pub fn load_config_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            read_config_file(p)?
        }
        None => match default_config_path() {
            Some(p) if p.exists() => read_config_file(&p)?,
            _ => Config::default(),
        },
    };

    config.apply_env(lookup);
    config.validate()?;

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every field is optional; the environment can override the server
//! identity after the file is read.

use serde::Deserialize;

use crate::error::ConfigError;

/// Server name used when neither the file nor `SERVER_NAME` sets one.
pub const DEFAULT_SERVER_NAME: &str = "mcp-server";

/// Server version used when neither the file nor `SERVER_VERSION` sets one.
pub const DEFAULT_SERVER_VERSION: &str = "1.0.0";

/// Description reported by `info://server` unless configured.
pub const DEFAULT_SERVER_DESCRIPTION: &str =
    "A template MCP server exposing example tools, resources and prompts";

/// Environment variable overriding the server name.
pub const ENV_SERVER_NAME: &str = "SERVER_NAME";

/// Environment variable overriding the server version.
pub const ENV_SERVER_VERSION: &str = "SERVER_VERSION";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Server identity settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Applies `SERVER_NAME` / `SERVER_VERSION` from a variable lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = non_empty(ENV_SERVER_NAME) {
            self.server.name = Some(name);
        }
        if let Some(version) = non_empty(ENV_SERVER_VERSION) {
            self.server.version = Some(version);
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("server.name", &self.server.name),
            ("server.version", &self.server.version),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::Invalid {
                    field: field.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Invalid {
                field: "logging.level".to_string(),
                message: format!(
                    "unknown level '{}'. Must be one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        Ok(())
    }

    /// Resolves the identity the server reports to clients.
    #[must_use]
    pub fn identity(&self) -> ServerIdentity {
        ServerIdentity {
            name: self
                .server
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            version: self
                .server
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVER_VERSION.to_string()),
            description: self
                .server
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVER_DESCRIPTION.to_string()),
        }
    }
}

/// Server identity as written in the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Version string.
    #[serde(default)]
    pub version: Option<String>,

    /// Free-form description for `info://server`.
    #[serde(default)]
    pub description: Option<String>,
}

/// Resolved server identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    /// Display name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Description.
    pub description: String,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Config::default().identity()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

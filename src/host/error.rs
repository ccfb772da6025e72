//! Error types for capability registration and dispatch.

use std::fmt;

use thiserror::Error;

/// Result type for capability host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Result type returned by capability handlers.
///
/// Any error a handler produces is reported to the caller as
/// [`HostError::Handler`] carrying the error's display text.
pub type HandlerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// The three capability kinds a host exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    /// Invokable function.
    Tool,
    /// Readable data endpoint addressed by URI.
    Resource,
    /// Conversation template generator.
    Prompt,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool => write!(f, "tool"),
            Self::Resource => write!(f, "resource"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// Errors that can occur while registering or dispatching capabilities.
#[derive(Debug, Error)]
pub enum HostError {
    /// A registration was rejected (duplicate name, malformed template).
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// No capability is registered under the requested name or URI.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Which registry was searched.
        kind: CapabilityKind,
        /// The name or URI that was requested.
        name: String,
    },

    /// An argument was missing or had the wrong type.
    #[error("invalid argument '{field}': {message}")]
    Validation {
        /// Name of the offending field.
        field: String,
        /// Description of what's wrong.
        message: String,
    },

    /// The handler itself failed.
    #[error("handler error: {message}")]
    Handler {
        /// The handler's error message.
        message: String,
    },
}

impl HostError {
    /// Returns a stable identifier for the error category.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation_error",
            Self::Handler { .. } => "handler_error",
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn duplicate(kind: CapabilityKind, name: &str) -> Self {
        Self::configuration(format!("{kind} '{name}' is already registered"))
    }

    pub(crate) fn not_found(kind: CapabilityKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

//! Error types for the Forward Email provider
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the Forward Email provider
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (provider config, manifest, declared attributes)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value does not match the type its attribute declares
    #[error("Type mismatch for attribute '{attribute}': expected {expected}, got {found}")]
    TypeMismatch {
        /// Attribute name
        attribute: String,
        /// Declared schema type
        expected: String,
        /// Shape of the offending value
        found: String,
    },

    /// Any failure reported by the remote API or its transport
    #[error("Remote API error{}: {message}", status_suffix(.status))]
    Remote {
        /// HTTP status, when the failure came from a response
        status: Option<u16>,
        /// Error message
        message: String,
    },

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Unknown resource or data source type
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    /// Invalid input (malformed identity keys, addresses)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        attribute: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            attribute: attribute.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a remote error carrying an HTTP status
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a remote error that never produced a response (network, decoding)
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the remote reported that the addressed entity does not exist
    ///
    /// Only the read path looks at this; every other operation surfaces
    /// the error as-is.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote { status: Some(404), .. })
    }

    /// Whether this is a configuration or type error (programmer-fixable)
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::TypeMismatch { .. } | Self::UnknownResourceType(_)
        )
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

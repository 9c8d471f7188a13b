//! Error types for the NATS Connect client
//!
//! Every stage of the session bootstrap and every RPC call reports one of
//! these variants. Nothing in the library exits the process or prints; the
//! caller decides whether to re-prompt, retry or give up.

use std::path::PathBuf;

/// Main error type for client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid environment '{0}' (expected production, development or local)")]
    InvalidEnvironment(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Parameter fetch error: {0}")]
    ParameterFetch(String),

    #[error("Transport configuration incomplete, missing: {}", .0.join(", "))]
    IncompleteTransportConfig(Vec<&'static str>),

    #[error("Failed to write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Request to {0} was cancelled")]
    Cancelled(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl ClientError {
    /// Whether the failure happened before any message reached the bus
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::MissingArgument(_)
                | Self::InvalidEnvironment(_)
                | Self::IncompleteTransportConfig(_)
                | Self::FileWrite { .. }
                | Self::Serialization(_)
                | Self::Encryption(_)
        )
    }
}

impl From<async_nats::ConnectError> for ClientError {
    fn from(err: async_nats::ConnectError) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

//! Error types for RCON delivery.

use thiserror::Error;

/// Failure while framing or exchanging a single packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The peer closed the connection before a full frame arrived.
    #[error("RCON connection closed")]
    ConnectionClosed,

    /// The frame header declared a length that cannot be a valid packet.
    #[error("Malformed RCON packet: {0}")]
    Malformed(String),

    /// The server answered with the unauthenticated marker id.
    #[error("RCON server rejected the request as unauthenticated")]
    Unauthenticated,

    /// Underlying socket error.
    #[error("RCON I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => ProtocolError::ConnectionClosed,
            _ => ProtocolError::Io(err.to_string()),
        }
    }
}

/// Main error type for RCON delivery operations.
#[derive(Error, Debug, Clone)]
pub enum RconError {
    /// Target has incomplete RCON configuration.
    #[error("Server {server} has incomplete RCON configuration: {message}")]
    InvalidTarget { server: String, message: String },

    /// Target rejected the RCON password.
    #[error("RCON authentication failed for server {server}: invalid password")]
    AuthRejected { server: String },

    /// DNS resolution or TCP connect failed.
    #[error("Failed to connect to RCON on server {server}: {message}")]
    Connect { server: String, message: String },

    /// Packet exchange failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Operation timed out.
    #[error("Operation timed out after {duration_ms}ms: {message}")]
    Timeout { duration_ms: u64, message: String },

    /// Command store or server registry could not be read.
    #[error("Lookup failed in {source_name}: {message}")]
    Lookup { source_name: String, message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Resource not found.
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    /// Connection error outside the RCON protocol (HTTP surfaces).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RconError {
    /// Returns true if this error takes the whole target out of the run.
    pub fn is_target_fatal(&self) -> bool {
        matches!(
            self,
            RconError::InvalidTarget { .. } | RconError::AuthRejected { .. } | RconError::Connect { .. }
        )
    }

    /// Returns true if another attempt of the same command may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RconError::Protocol(ProtocolError::Unauthenticated) => false,
            RconError::Protocol(_) => true,
            RconError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Helper for store/registry failures.
    pub fn lookup(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        RconError::Lookup {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Convenience Result type for RCON operations.
pub type Result<T> = std::result::Result<T, RconError>;

impl From<serde_json::Error> for RconError {
    fn from(err: serde_json::Error) -> Self {
        RconError::Serialization(err.to_string())
    }
}

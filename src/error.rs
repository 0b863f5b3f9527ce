//! YANS error types

use thiserror::Error;

use crate::storage::StorageError;

/// Server-wide error type.
///
/// Protocol-level conditions (syntax errors, not-found lookups) are not
/// errors: handlers reply with the appropriate 4xx/5xx status and carry on.
/// A `YansError` escaping a handler is fatal to the session.
#[derive(Error, Debug)]
pub enum YansError {
    /// IO error on the client connection or attachment store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Client sent no data within the idle window
    #[error("Connection idle timeout")]
    IdleTimeout,

    /// Peer closed the connection
    #[error("Connection closed")]
    ConnectionClosed,

    /// Storage backend fault (not-found is reported separately)
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Inbound article payload could not be parsed
    #[error("Malformed article: {0}")]
    Envelope(String),

    /// Configuration file missing or unparseable
    #[error("Config error: {0}")]
    Config(String),

    /// WebSocket handshake or framing error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Wildmat or date argument that cannot be compiled/parsed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias using YansError
pub type Result<T> = std::result::Result<T, YansError>;

//! Error types for the webshell-terminal crate.

use thiserror::Error;

/// All errors that can end a terminal session.
///
/// Every variant is terminal for the session; callers tear the connection
/// down rather than retry.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// The WebSocket transport failed while reading or writing.
    #[error("WebSocket transport error: {0}")]
    Transport(String),

    /// The browser closed the WebSocket.
    #[error("WebSocket connection closed")]
    ConnectionClosed,

    /// No inbound frame arrived before the idle read deadline.
    #[error("read deadline exceeded after {ms}ms")]
    ReadTimeout { ms: u64 },

    /// An inbound frame was not a valid JSON terminal message.
    #[error("malformed terminal message: {0}")]
    Decode(#[source] serde_json::Error),

    /// An inbound frame named an operation the adapter does not route.
    #[error("unknown message type '{0}'")]
    UnknownOperation(String),

    /// An outbound `stdout` frame could not be serialized.
    #[error("failed to encode stdout message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The owner signalled done while a resize was waiting to be consumed.
    #[error("terminal session is done")]
    SessionDone,

    /// The exec backend could not open or drive the remote process.
    #[error("exec error: {0}")]
    Exec(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure returned by [`crate::session::TerminalSession::read`].
///
/// `written` bytes of the end-of-transmission sentinel have already been
/// copied into the caller's buffer and should be forwarded to the process so
/// its stdin ends.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ReadError {
    pub written: usize,
    #[source]
    pub source: TerminalError,
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, TerminalError>;

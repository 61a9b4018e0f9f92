//! Transport seam between a [`TerminalSession`](crate::session::TerminalSession)
//! and whatever carries its frames.
//!
//! The gateway implements these for the two halves of an axum WebSocket.
//! Control frames (ping, pong) are the transport's business and never
//! surface here.

use async_trait::async_trait;

use crate::error::{Result, TerminalError};

/// Inbound half: yields the payload of each data frame.
#[async_trait]
pub trait MessageSource: Send {
    /// Next text or binary frame payload. `None` once the peer has closed.
    async fn recv(&mut self) -> Option<std::result::Result<Vec<u8>, TerminalError>>;
}

/// Outbound half.
#[async_trait]
pub trait MessageSink: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Close the connection. Best-effort; a second close may fail.
    async fn close(&mut self) -> Result<()>;
}

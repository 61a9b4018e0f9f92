use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use webshell_terminal::{
    transport::{MessageSink, MessageSource},
    TerminalError,
};

/// Inbound half of an axum WebSocket.
pub struct WsSource(SplitStream<WebSocket>);

/// Outbound half of an axum WebSocket.
pub struct WsSink(SplitSink<WebSocket, Message>);

/// Split an upgraded socket into session transport halves.
pub fn split(socket: WebSocket) -> (WsSource, WsSink) {
    let (tx, rx) = socket.split();
    (WsSource(rx), WsSink(tx))
}

#[async_trait]
impl MessageSource for WsSource {
    async fn recv(&mut self) -> Option<Result<Vec<u8>, TerminalError>> {
        loop {
            match self.0.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().as_bytes().to_vec())),
                Ok(Message::Binary(data)) => return Some(Ok(data.to_vec())),
                // pongs are queued by the protocol layer and flushed on the next write
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(_)) => return None,
                Err(e) => return Some(Err(TerminalError::Transport(e.to_string()))),
            }
        }
    }
}

#[async_trait]
impl MessageSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), TerminalError> {
        self.0
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TerminalError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TerminalError> {
        self.0
            .close()
            .await
            .map_err(|e| TerminalError::Transport(e.to_string()))
    }
}

use axum::extract::WebSocketUpgrade;
use axum::http::{header, HeaderMap};
use std::time::Duration;
use webshell_core::config::TerminalConfig;

/// WebSocket upgrader settings, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct UpgradeConfig {
    pub read_buffer_size: usize,
    pub write_buffer_size: usize,
    /// Largest single inbound message accepted.
    pub max_message_size: usize,
    pub handshake_timeout: Duration,
    /// Empty accepts every origin.
    pub allowed_origins: Vec<String>,
}

impl From<&TerminalConfig> for UpgradeConfig {
    fn from(cfg: &TerminalConfig) -> Self {
        Self {
            read_buffer_size: cfg.read_buffer_size,
            write_buffer_size: cfg.write_buffer_size,
            max_message_size: cfg.max_message_size,
            handshake_timeout: cfg.handshake_timeout(),
            allowed_origins: cfg.allowed_origins.clone(),
        }
    }
}

impl UpgradeConfig {
    /// Apply buffer and message limits to a pending upgrade.
    pub fn apply(&self, ws: WebSocketUpgrade) -> WebSocketUpgrade {
        ws.read_buffer_size(self.read_buffer_size)
            .write_buffer_size(self.write_buffer_size)
            .max_message_size(self.max_message_size)
    }

    /// Origin policy. Requests without an `Origin` header (non-browser
    /// clients) are accepted.
    pub fn origin_allowed(&self, headers: &HeaderMap) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        match headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
            Some(origin) => self
                .allowed_origins
                .iter()
                .any(|allowed| allowed.trim_end_matches('/') == origin.trim_end_matches('/')),
            None => true,
        }
    }
}

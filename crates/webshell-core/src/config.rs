use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8090;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60; // nginx drops idle upstreams after 60s
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_READ_BUFFER_SIZE: usize = 256;
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 2048;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096; // single inbound frame cap

/// Top-level config (webshell.toml + WEBSHELL_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebshellConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub exec: ExecConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Per-connection knobs: idle read deadline plus the WebSocket upgrader limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Idle deadline re-armed before every inbound read.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    #[serde(default = "default_write_buffer_size")]
    pub write_buffer_size: usize,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Accepted `Origin` header values. Empty means every origin is accepted.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            allowed_origins: Vec::new(),
        }
    }
}

impl TerminalConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Which collaborator actually runs the remote process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExecBackendKind {
    /// Kubernetes `pods/exec` through the in-cluster or kubeconfig client.
    #[default]
    Kube,
    /// Local pseudo-terminal running `pty_command` + the requested command.
    Pty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    #[serde(default)]
    pub backend: ExecBackendKind,
    /// Command used when the client does not request one.
    #[serde(default = "default_shell")]
    pub shell: Vec<String>,
    /// Argv prefix for the PTY backend. `{namespace}`, `{pod}` and
    /// `{container}` are substituted from the request.
    #[serde(default = "default_pty_command")]
    pub pty_command: Vec<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            backend: ExecBackendKind::default(),
            shell: default_shell(),
            pty_command: default_pty_command(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}
fn default_handshake_timeout_ms() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_MS
}
fn default_read_buffer_size() -> usize {
    DEFAULT_READ_BUFFER_SIZE
}
fn default_write_buffer_size() -> usize {
    DEFAULT_WRITE_BUFFER_SIZE
}
fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}
fn default_shell() -> Vec<String> {
    vec!["/bin/sh".to_string()]
}
fn default_pty_command() -> Vec<String> {
    ["docker", "exec", "-it", "{container}"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl WebshellConfig {
    /// Load config from a TOML file with WEBSHELL_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.webshell/webshell.toml
    ///
    /// Nested env keys use a double underscore, e.g.
    /// `WEBSHELL_TERMINAL__READ_TIMEOUT_SECS=30`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: WebshellConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("WEBSHELL_").split("__"))
            .extract()
            .map_err(|e| crate::error::WebshellError::Config(e.to_string()))?;

        tracing::debug!(path = %path, "config loaded");
        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.webshell/webshell.toml", home)
}

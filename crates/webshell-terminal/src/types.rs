//! Shared data types for webshell-terminal.

use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque identifier for a terminal session, used to correlate log lines.
///
/// Wraps a `String` so the internal representation can change without
/// breaking callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh random session ID (UUIDv4).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// TerminalSize
// ---------------------------------------------------------------------------

/// Terminal dimensions requested by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    /// Columns.
    pub width: u16,
    /// Rows.
    pub height: u16,
}

// ---------------------------------------------------------------------------
// ExecTarget
// ---------------------------------------------------------------------------

/// The process a session attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecTarget {
    pub namespace: String,
    pub pod: String,
    /// Container inside the pod; the pod's default container when `None`.
    pub container: Option<String>,
    /// Argv of the process to start.
    pub command: Vec<String>,
}

impl ExecTarget {
    pub fn new(
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container: Option<String>,
        command: Vec<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            container,
            command,
        }
    }

    /// Container name, falling back to the pod name.
    pub fn container_or_pod(&self) -> &str {
        self.container.as_deref().unwrap_or(&self.pod)
    }
}

impl fmt::Display for ExecTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container {
            Some(c) => write!(f, "{}/{}/{}", self.namespace, self.pod, c),
            None => write!(f, "{}/{}", self.namespace, self.pod),
        }
    }
}

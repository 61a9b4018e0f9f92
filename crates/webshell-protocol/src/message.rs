use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Written into the caller's read buffer when the session must force the
/// remote shell's stdin to end (ASCII EOT, same byte as Ctrl-D).
pub const END_OF_TRANSMISSION: &[u8] = b"\x04";

/// Operation discriminator carried in every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Browser → process keystrokes.
    Stdin,
    /// Browser terminal changed size.
    Resize,
    /// Browser keepalive; carries nothing.
    Ping,
    /// Process → browser output.
    Stdout,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Stdin => "stdin",
            Operation::Resize => "resize",
            Operation::Ping => "ping",
            Operation::Stdout => "stdout",
        }
    }

    /// Map a wire name to an operation. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "stdin" => Some(Operation::Stdin),
            "resize" => Some(Operation::Resize),
            "ping" => Some(Operation::Ping),
            "stdout" => Some(Operation::Stdout),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One JSON frame in either direction.
///
/// Wire (inbound):  `{ "operation": "resize", "cols": 120, "rows": 40 }`
/// Wire (outbound): `{ "operation": "stdout", "data": "$ " }`
///
/// Every field defaults to its zero value, whether missing or `null`, so that
/// a frame with an unknown or missing operation still decodes and can be
/// rejected by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub operation: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_zero"
    )]
    pub rows: u16,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_zero"
    )]
    pub cols: u16,
}

fn is_zero(v: &u16) -> bool {
    *v == 0
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl TerminalMessage {
    pub fn stdout(data: impl Into<String>) -> Self {
        Self {
            operation: Operation::Stdout.as_str().to_string(),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn stdin(data: impl Into<String>) -> Self {
        Self {
            operation: Operation::Stdin.as_str().to_string(),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn resize(cols: u16, rows: u16) -> Self {
        Self {
            operation: Operation::Resize.as_str().to_string(),
            cols,
            rows,
            ..Default::default()
        }
    }

    pub fn ping() -> Self {
        Self {
            operation: Operation::Ping.as_str().to_string(),
            ..Default::default()
        }
    }

    /// The decoded operation, or `None` when the name is not recognised.
    pub fn kind(&self) -> Option<Operation> {
        Operation::parse(&self.operation)
    }
}

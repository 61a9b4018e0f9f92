//! Exec backends: open the remote process a session talks to.
//!
//! Both backends hand back the same channel-based [`ExecStreams`], so the
//! bridge does not care whether the process runs in a pod or under a local
//! PTY.

mod kubernetes;
mod pty;

pub use kubernetes::KubeExecBackend;
pub use pty::PtyExecBackend;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    error::Result,
    types::{ExecTarget, TerminalSize},
};

/// Depth of each stdin/output/resize channel.
pub(crate) const STREAM_CAPACITY: usize = 64;

/// Size of the chunks process output is read in.
pub(crate) const OUTPUT_CHUNK: usize = 4096;

/// Opens interactive processes.
#[async_trait]
pub trait ExecBackend: Send + Sync {
    /// Start `target.command` attached to a TTY and return its streams.
    async fn open(&self, target: &ExecTarget) -> Result<ExecStreams>;

    /// Short name for logs and `/health`.
    fn name(&self) -> &'static str;
}

/// Session-facing handles of an opened process.
///
/// `output` closes when the process exits. Dropping `stdin` closes the
/// process's stdin.
pub struct ExecStreams {
    pub stdin: mpsc::Sender<Vec<u8>>,
    pub output: mpsc::Receiver<Vec<u8>>,
    pub resize: mpsc::Sender<TerminalSize>,
}

/// Process-facing halves of the same channels, driven by a backend.
pub struct ProcessEnds {
    pub stdin: mpsc::Receiver<Vec<u8>>,
    pub output: mpsc::Sender<Vec<u8>>,
    pub resize: mpsc::Receiver<TerminalSize>,
}

impl ExecStreams {
    /// Create a connected pair of stream handles.
    pub fn channel() -> (ExecStreams, ProcessEnds) {
        let (stdin_tx, stdin_rx) = mpsc::channel(STREAM_CAPACITY);
        let (output_tx, output_rx) = mpsc::channel(STREAM_CAPACITY);
        let (resize_tx, resize_rx) = mpsc::channel(STREAM_CAPACITY);
        (
            ExecStreams {
                stdin: stdin_tx,
                output: output_rx,
                resize: resize_tx,
            },
            ProcessEnds {
                stdin: stdin_rx,
                output: output_tx,
                resize: resize_rx,
            },
        )
    }
}

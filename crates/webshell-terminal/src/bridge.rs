//! Exec driver: pumps a [`TerminalSession`] against an opened process.
//!
//! Three concurrent roles, one per session call:
//! - stdin pump (own task): `session.read` → process stdin
//! - resize pump (own task): `session.next` → process resize
//! - output pump (caller's task): process output → `session.write`
//!
//! The bridge ends when the process output closes or the browser stops
//! accepting writes. It then signals done, stops the pumps, and closes the
//! socket, in that order.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{exec::ExecStreams, session::TerminalSession, types::TerminalSize};

/// Buffer handed to each `session.read` call.
const STDIN_BUF_SIZE: usize = 32 * 1024;

/// How long output keeps draining after stdin has ended, giving the shell
/// time to exit on the end-of-transmission byte.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Traffic counters for one bridged session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeSummary {
    /// Stdin bytes forwarded to the process, sentinel included.
    pub bytes_in: u64,
    /// Output bytes the process produced.
    pub bytes_out: u64,
    /// Resize events forwarded to the process.
    pub resizes: u64,
}

/// Drive `session` against `streams` until either side goes away.
pub async fn run(session: Arc<TerminalSession>, streams: ExecStreams) -> BridgeSummary {
    let ExecStreams {
        stdin,
        mut output,
        resize,
    } = streams;

    let bytes_in = Arc::new(AtomicU64::new(0));
    let mut stdin_task = tokio::spawn(pump_stdin(
        Arc::clone(&session),
        stdin,
        Arc::clone(&bytes_in),
    ));
    let resize_task = tokio::spawn(pump_resize(Arc::clone(&session), resize));

    let mut bytes_out = 0u64;
    let mut stdin_open = true;
    loop {
        let chunk = if stdin_open {
            tokio::select! {
                chunk = output.recv() => chunk,
                _ = &mut stdin_task => {
                    stdin_open = false;
                    continue;
                }
            }
        } else {
            match tokio::time::timeout(DRAIN_GRACE, output.recv()).await {
                Ok(chunk) => chunk,
                Err(_) => {
                    debug!(session_id = %session.id(), "process still running after stdin ended");
                    break;
                }
            }
        };

        let Some(chunk) = chunk else {
            debug!(session_id = %session.id(), "process output closed");
            break;
        };
        match session.write(&chunk).await {
            Ok(n) => bytes_out += n as u64,
            Err(_) => break,
        }
    }

    session.done();
    if stdin_open {
        stdin_task.abort();
    }
    let resizes = resize_task.await.unwrap_or_default();

    if let Err(e) = session.close().await {
        debug!(session_id = %session.id(), error = %e, "close failed");
    }

    let summary = BridgeSummary {
        bytes_in: bytes_in.load(Ordering::Relaxed),
        bytes_out,
        resizes,
    };
    info!(
        session_id = %session.id(),
        bytes_in = summary.bytes_in,
        bytes_out = summary.bytes_out,
        resizes = summary.resizes,
        "bridge finished"
    );
    summary
}

/// Forward stdin until the session read fails, then forward the sentinel
/// and drop the sender so the process sees its stdin close.
async fn pump_stdin(
    session: Arc<TerminalSession>,
    stdin: mpsc::Sender<Vec<u8>>,
    counter: Arc<AtomicU64>,
) {
    let mut buf = vec![0u8; STDIN_BUF_SIZE];
    loop {
        let (n, last) = match session.read(&mut buf).await {
            Ok(0) => continue,
            Ok(n) => (n, false),
            Err(e) => {
                debug!(session_id = %session.id(), error = %e, "stdin ended");
                (e.written, true)
            }
        };
        if n > 0 {
            if stdin.send(buf[..n].to_vec()).await.is_err() {
                debug!(session_id = %session.id(), "process stdin closed");
                break;
            }
            counter.fetch_add(n as u64, Ordering::Relaxed);
        }
        if last {
            break;
        }
    }
}

/// Forward resizes until done fires. A process that no longer takes
/// resizes does not stop the pump: `read` still needs `next` to drain.
async fn pump_resize(session: Arc<TerminalSession>, resize: mpsc::Sender<TerminalSize>) -> u64 {
    let mut forwarded = 0;
    while let Some(size) = session.next().await {
        if resize.send(size).await.is_ok() {
            forwarded += 1;
        }
    }
    forwarded
}

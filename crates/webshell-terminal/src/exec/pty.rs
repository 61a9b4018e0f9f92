//! Local PTY backend built on `portable-pty`.
//!
//! Runs `prefix + command` under a pseudo-terminal, where the prefix is a
//! configured argv template such as `docker exec -it {container}`. Blocking
//! PTY I/O runs on dedicated OS threads so it never blocks Tokio.

use async_trait::async_trait;
use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use std::io::{Read, Write};
use tracing::{debug, info, warn};

use super::{ExecBackend, ExecStreams, ProcessEnds, OUTPUT_CHUNK};
use crate::{
    error::{Result, TerminalError},
    types::ExecTarget,
};

/// Initial window until the browser sends its first resize.
const INITIAL_SIZE: PtySize = PtySize {
    rows: 24,
    cols: 80,
    pixel_width: 0,
    pixel_height: 0,
};

/// Spawns the target command under a local pseudo-terminal.
pub struct PtyExecBackend {
    prefix: Vec<String>,
}

impl PtyExecBackend {
    /// `prefix` is prepended to every command; `{namespace}`, `{pod}` and
    /// `{container}` are substituted from the target.
    pub fn new(prefix: Vec<String>) -> Self {
        Self { prefix }
    }

    fn argv(&self, target: &ExecTarget) -> Vec<String> {
        self.prefix
            .iter()
            .map(|arg| {
                arg.replace("{namespace}", &target.namespace)
                    .replace("{pod}", &target.pod)
                    .replace("{container}", target.container_or_pod())
            })
            .chain(target.command.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl ExecBackend for PtyExecBackend {
    async fn open(&self, target: &ExecTarget) -> Result<ExecStreams> {
        let argv = self.argv(target);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| TerminalError::Exec("empty command".to_string()))?;

        let pair = native_pty_system()
            .openpty(INITIAL_SIZE)
            .map_err(|e| TerminalError::Exec(e.to_string()))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| TerminalError::Exec(format!("spawn failed: {e}")))?;
        // Only the child holds the slave end, so the reader sees EOF on exit.
        drop(pair.slave);

        let mut writer = pair
            .master
            .take_writer()
            .map_err(|e| TerminalError::Exec(e.to_string()))?;
        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TerminalError::Exec(e.to_string()))?;
        let master = pair.master;

        info!(exec_target = %target, argv = ?argv, "pty exec session established");

        let (streams, ends) = ExecStreams::channel();
        let ProcessEnds {
            mut stdin,
            output,
            mut resize,
        } = ends;

        std::thread::spawn(move || {
            let mut raw = [0u8; OUTPUT_CHUNK];
            loop {
                match reader.read(&mut raw) {
                    Ok(0) => break, // EOF — process exited
                    Ok(n) => {
                        if output.blocking_send(raw[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // EIO is how Linux reports a hung-up PTY.
                        debug!("PTY reader error: {e}");
                        break;
                    }
                }
            }
            debug!("PTY reader thread exited");
        });

        std::thread::spawn(move || {
            while let Some(chunk) = stdin.blocking_recv() {
                if let Err(e) = writer.write_all(&chunk).and_then(|()| writer.flush()) {
                    warn!("PTY writer error: {e}");
                    break;
                }
            }
            debug!("PTY writer thread exited");
        });

        // Dropping the master when the session goes away hangs up the child.
        tokio::spawn(async move {
            while let Some(size) = resize.recv().await {
                let size = PtySize {
                    rows: size.height,
                    cols: size.width,
                    pixel_width: 0,
                    pixel_height: 0,
                };
                if let Err(e) = master.resize(size) {
                    warn!("PTY resize failed: {e}");
                }
            }
        });

        let target = target.to_string();
        std::thread::spawn(move || match child.wait() {
            Ok(status) => info!(
                exec_target = %target,
                exit_code = status.exit_code(),
                "pty process exited"
            ),
            Err(e) => warn!(exec_target = %target, "pty wait failed: {e}"),
        });

        Ok(streams)
    }

    fn name(&self) -> &'static str {
        "pty"
    }
}

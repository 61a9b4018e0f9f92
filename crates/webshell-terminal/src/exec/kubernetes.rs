//! Kubernetes `pods/exec` backend using kube-rs `AttachedProcess`.

use async_trait::async_trait;
use futures_util::SinkExt;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::{
    api::{Api, AttachParams, TerminalSize as KubeTerminalSize},
    Client,
};
use std::future::Future;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ExecBackend, ExecStreams, ProcessEnds, OUTPUT_CHUNK};
use crate::{
    error::{Result, TerminalError},
    types::ExecTarget,
};

/// Exec into pods through the Kubernetes API server.
pub struct KubeExecBackend {
    client: Client,
}

impl KubeExecBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the in-cluster environment or local kubeconfig.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| TerminalError::Exec(format!("failed to create K8s client: {e}")))?;
        Ok(Self::new(client))
    }
}

/// Interactive TTY: stdin + stdout, stderr merged into the TTY.
fn attach_params(target: &ExecTarget) -> AttachParams {
    let params = AttachParams::interactive_tty();
    match &target.container {
        Some(container) => params.container(container.clone()),
        None => params,
    }
}

#[async_trait]
impl ExecBackend for KubeExecBackend {
    async fn open(&self, target: &ExecTarget) -> Result<ExecStreams> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &target.namespace);
        let mut attached = pods
            .exec(&target.pod, target.command.clone(), &attach_params(target))
            .await
            .map_err(|e| TerminalError::Exec(format!("exec failed: {e}")))?;

        info!(exec_target = %target, command = ?target.command, "kube exec session established");

        let (streams, ends) = ExecStreams::channel();
        let ProcessEnds {
            stdin,
            output,
            mut resize,
        } = ends;

        if let Some(stdout) = attached.stdout() {
            tokio::spawn(forward_reader_to_channel(stdout, output));
        }

        if let Some(writer) = attached.stdin() {
            tokio::spawn(forward_channel_to_writer(stdin, writer));
        }

        // The resize channel closes once the bridge has torn the session down.
        let session_gone = CancellationToken::new();
        let mut size_tx = attached.terminal_size();
        tokio::spawn({
            let session_gone = session_gone.clone();
            async move {
                while let Some(size) = resize.recv().await {
                    let Some(tx) = size_tx.as_mut() else { continue };
                    let size = KubeTerminalSize {
                        width: size.width,
                        height: size.height,
                    };
                    if tx.send(size).await.is_err() {
                        size_tx = None;
                    }
                }
                session_gone.cancel();
            }
        });

        let status = attached.take_status();
        tokio::spawn(hold_until_finished(
            attached,
            status,
            session_gone,
            target.to_string(),
        ));

        Ok(streams)
    }

    fn name(&self) -> &'static str {
        "kube"
    }
}

/// Keep `attached`, which owns the exec WebSocket, alive until the API server
/// reports the final status or the session goes away, whichever comes first.
/// Dropping it closes the exec stream.
async fn hold_until_finished<A, S>(
    attached: A,
    status: Option<S>,
    session_gone: CancellationToken,
    target: String,
) where
    S: Future<Output = Option<Status>>,
{
    let Some(status) = status else {
        warn!(exec_target = %target, "kube exec status unavailable");
        session_gone.cancelled().await;
        drop(attached);
        return;
    };

    tokio::select! {
        status = status => match status {
            Some(status) => info!(
                exec_target = %target,
                status = ?status.status,
                message = ?status.message,
                "kube exec finished"
            ),
            None => debug!(exec_target = %target, "kube exec finished without status"),
        },
        _ = session_gone.cancelled() => {
            debug!(exec_target = %target, "session ended before the process; closing exec stream")
        }
    }
    drop(attached);
}

/// Forward an async reader to the output channel in fixed-size chunks.
///
/// Stops when the reader is exhausted, errors, or the channel closes.
async fn forward_reader_to_channel<R: AsyncRead + Unpin>(
    mut reader: R,
    tx: mpsc::Sender<Vec<u8>>,
) {
    let mut buf = vec![0u8; OUTPUT_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "exec stdout read failed");
                break;
            }
        }
    }
}

/// Write each stdin chunk to the process and flush it.
///
/// Stops when the channel closes or the writer fails.
async fn forward_channel_to_writer<W: AsyncWrite + Unpin>(
    mut rx: mpsc::Receiver<Vec<u8>>,
    mut writer: W,
) {
    while let Some(chunk) = rx.recv().await {
        if let Err(e) = writer.write_all(&chunk).await {
            debug!(error = %e, "exec stdin write failed");
            break;
        }
        if let Err(e) = writer.flush().await {
            debug!(error = %e, "exec stdin flush failed");
            break;
        }
    }
}

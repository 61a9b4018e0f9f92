use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use webshell_terminal::{bridge, ExecTarget, SessionOptions, TerminalSession};

use crate::app::AppState;
use crate::ws::transport;

/// Query string of the exec endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ExecQuery {
    pub container: Option<String>,
    /// Whitespace-separated argv; the configured shell when absent.
    pub command: Option<String>,
}

impl ExecQuery {
    fn into_target(self, namespace: String, pod: String, shell: &[String]) -> ExecTarget {
        let command = self
            .command
            .map(|c| c.split_whitespace().map(String::from).collect::<Vec<_>>())
            .filter(|argv| !argv.is_empty())
            .unwrap_or_else(|| shell.to_vec());
        let container = self.container.filter(|c| !c.is_empty());
        ExecTarget::new(namespace, pod, container, command)
    }
}

/// Axum handler — upgrades HTTP to WebSocket at GET /ws/exec/{namespace}/{pod}.
pub async fn exec_handler(
    Path((namespace, pod)): Path<(String, String)>,
    Query(query): Query<ExecQuery>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if !state.upgrade.origin_allowed(&headers) {
        warn!(origin = ?headers.get("origin"), "origin not allowed");
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(error = %rejection, "websocket upgrade rejected");
            return rejection.into_response();
        }
    };

    let target = query.into_target(namespace, pod, &state.config.exec.shell);
    state
        .upgrade
        .apply(ws)
        .on_failed_upgrade(|e| warn!(error = %e, "websocket handshake failed"))
        .on_upgrade(move |socket| run_session(socket, state, target))
}

/// Per-connection lifetime: open the process, then bridge until either side ends.
async fn run_session(socket: WebSocket, state: Arc<AppState>, target: ExecTarget) {
    let (source, sink) = transport::split(socket);
    let session = Arc::new(TerminalSession::new(
        source,
        sink,
        SessionOptions {
            read_timeout: state.config.terminal.read_timeout(),
        },
    ));
    let id = session.id().clone();
    info!(
        session_id = %id,
        exec_target = %target,
        backend = state.backend.name(),
        "terminal session opened"
    );

    let streams = match state.backend.open(&target).await {
        Ok(streams) => streams,
        Err(e) => {
            warn!(session_id = %id, exec_target = %target, error = %e, "exec open failed");
            // Surface the failure in the browser terminal before closing.
            let _ = session.write(format!("\r\n{e}\r\n").as_bytes()).await;
            session.done();
            let _ = session.close().await;
            return;
        }
    };

    state.sessions.insert(id.clone(), target);
    bridge::run(session, streams).await;
    state.sessions.remove(&id);
}

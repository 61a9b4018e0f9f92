use axum::{routing::get, Router};
use dashmap::DashMap;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use webshell_core::config::WebshellConfig;
use webshell_terminal::{exec::ExecBackend, ExecTarget, SessionId};

use crate::ws::upgrade::UpgradeConfig;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: WebshellConfig,
    /// Built once at startup from `config.terminal`; never mutated.
    pub upgrade: UpgradeConfig,
    pub backend: Arc<dyn ExecBackend>,
    /// Live terminal sessions: session id -> what it is attached to.
    pub sessions: DashMap<SessionId, ExecTarget>,
}

impl AppState {
    pub fn new(config: WebshellConfig, backend: Arc<dyn ExecBackend>) -> Self {
        let upgrade = UpgradeConfig::from(&config.terminal);
        Self {
            config,
            upgrade,
            backend,
            sessions: DashMap::new(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Bounds the HTTP side of the handshake; the upgraded socket is not
    // subject to it.
    let handshake_timeout = TimeoutLayer::new(state.upgrade.handshake_timeout);

    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/ws/exec/{namespace}/{pod}",
            get(crate::ws::exec::exec_handler).layer(handshake_timeout),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

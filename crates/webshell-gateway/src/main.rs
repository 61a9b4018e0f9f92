use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use webshell_core::config::{ExecBackendKind, WebshellConfig};
use webshell_terminal::exec::{ExecBackend, KubeExecBackend, PtyExecBackend};

mod app;
mod http;
mod ws;

/// Browser terminal gateway: bridges WebSocket sessions to container shells.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file path (overrides WEBSHELL_CONFIG).
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "webshell_gateway=info,webshell_terminal=info,tower_http=debug".into()
            }),
        )
        .init();

    let args = Args::parse();

    // load config: --config > WEBSHELL_CONFIG env > ~/.webshell/webshell.toml
    let config_path = args.config.or_else(|| std::env::var("WEBSHELL_CONFIG").ok());
    let config = WebshellConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        WebshellConfig::default()
    });

    let backend = build_backend(&config).await?;
    info!(backend = backend.name(), "exec backend ready");

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, backend));
    let router = app::build_router(state);

    info!("webshell gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("webshell gateway stopped");
    Ok(())
}

/// Pick the exec backend named in config.
async fn build_backend(config: &WebshellConfig) -> anyhow::Result<Arc<dyn ExecBackend>> {
    let backend: Arc<dyn ExecBackend> = match config.exec.backend {
        ExecBackendKind::Kube => Arc::new(KubeExecBackend::try_default().await?),
        ExecBackendKind::Pty => Arc::new(PtyExecBackend::new(config.exec.pty_command.clone())),
    };
    Ok(backend)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

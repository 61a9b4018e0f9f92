//! webshell-terminal — glue between a browser terminal speaking JSON over a
//! WebSocket and a remote interactive process.
//!
//! - [`session::TerminalSession`] adapts the socket to the read / write /
//!   next-resize shape an exec client drives.
//! - [`bridge::run`] is that exec client: it pumps a session against the
//!   stdin/output/resize channels of an opened process.
//! - [`exec`] opens processes, either through Kubernetes `pods/exec` or a
//!   local PTY.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webshell_terminal::exec::{ExecBackend, KubeExecBackend};
//! use webshell_terminal::session::{SessionOptions, TerminalSession};
//! use webshell_terminal::transport::{MessageSink, MessageSource};
//! use webshell_terminal::types::ExecTarget;
//!
//! async fn attach(source: impl MessageSource + 'static, sink: impl MessageSink + 'static) {
//!     let backend = KubeExecBackend::try_default().await.unwrap();
//!     let target = ExecTarget::new("default", "web-0", None, vec!["/bin/sh".into()]);
//!     let streams = backend.open(&target).await.unwrap();
//!
//!     let session = Arc::new(TerminalSession::new(source, sink, SessionOptions::default()));
//!     let summary = webshell_terminal::bridge::run(session, streams).await;
//!     println!("{} bytes out", summary.bytes_out);
//! }
//! ```

pub mod bridge;
pub mod error;
pub mod exec;
pub mod session;
pub mod transport;
pub mod types;
pub mod utf8;

pub use error::{ReadError, Result, TerminalError};
pub use session::{SessionOptions, TerminalSession};
pub use types::{ExecTarget, SessionId, TerminalSize};

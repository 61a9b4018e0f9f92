//! Terminal session: one browser WebSocket adapted to the read / write /
//! next-resize interface an exec client drives.
//!
//! The three calls run concurrently from separate tasks against a shared
//! `Arc<TerminalSession>`:
//! - `read` pulls one JSON frame, routes it, and fills the caller's buffer
//!   with stdin bytes
//! - `write` wraps process output in a `stdout` frame
//! - `next` waits for the resize events `read` hands over
//!
//! The owner must call [`TerminalSession::done`] before
//! [`TerminalSession::close`], otherwise a pending `next` never returns.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use webshell_protocol::{Operation, TerminalMessage, END_OF_TRANSMISSION};

use crate::{
    error::{ReadError, Result, TerminalError},
    transport::{MessageSink, MessageSource},
    types::{SessionId, TerminalSize},
    utf8,
};

/// Default idle deadline for inbound reads.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-session knobs.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Re-armed before every inbound read. A browser that sends nothing (not
    /// even `ping`) for this long ends the session.
    pub read_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// A resize waiting for `next`; `taken` fires once it has been consumed.
struct ResizeHandoff {
    size: TerminalSize,
    taken: oneshot::Sender<()>,
}

/// A live browser ↔ process terminal session.
///
/// Inbound and outbound halves sit behind separate async mutexes, so one
/// `read` and one `write` can be in flight at the same time.
pub struct TerminalSession {
    id: SessionId,
    source: Mutex<Box<dyn MessageSource>>,
    sink: Mutex<Box<dyn MessageSink>>,
    resize_tx: mpsc::Sender<ResizeHandoff>,
    resize_rx: Mutex<mpsc::Receiver<ResizeHandoff>>,
    done: CancellationToken,
    read_timeout: Duration,
}

impl TerminalSession {
    /// Wrap an established connection.
    pub fn new(
        source: impl MessageSource + 'static,
        sink: impl MessageSink + 'static,
        options: SessionOptions,
    ) -> Self {
        let (resize_tx, resize_rx) = mpsc::channel(1);
        Self {
            id: SessionId::new(),
            source: Mutex::new(Box::new(source)),
            sink: Mutex::new(Box::new(sink)),
            resize_tx,
            resize_rx: Mutex::new(resize_rx),
            done: CancellationToken::new(),
            read_timeout: options.read_timeout,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Fill `buf` with the next chunk of stdin.
    ///
    /// Returns `Ok(0)` for frames that carry no stdin (`resize`, `ping`).
    /// Stdin longer than `buf` is truncated.
    ///
    /// # Errors
    ///
    /// On any failure the end-of-transmission sentinel is copied into `buf`
    /// and its length reported in [`ReadError::written`]:
    /// - `ReadTimeout`       — nothing arrived within the read deadline
    /// - `ConnectionClosed`  — the browser closed the socket
    /// - `Transport`         — the socket failed
    /// - `Decode`            — the frame was not a terminal message
    /// - `UnknownOperation`  — the frame named an operation we do not route
    /// - `SessionDone`       — done fired while a resize was pending
    pub async fn read(&self, buf: &mut [u8]) -> std::result::Result<usize, ReadError> {
        let payload = match self.recv_frame().await {
            Ok(payload) => payload,
            Err(e) => {
                match &e {
                    TerminalError::ConnectionClosed => {
                        debug!(session_id = %self.id, "browser closed connection")
                    }
                    _ => warn!(session_id = %self.id, error = %e, "read message failed"),
                }
                return Err(terminate(buf, e));
            }
        };

        let msg: TerminalMessage = match serde_json::from_slice(&payload) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "read parse message failed");
                return Err(terminate(buf, TerminalError::Decode(e)));
            }
        };

        match msg.kind() {
            Some(Operation::Stdin) => Ok(copy_into(buf, msg.data.as_bytes())),
            Some(Operation::Resize) => {
                let size = TerminalSize {
                    width: msg.cols,
                    height: msg.rows,
                };
                debug!(session_id = %self.id, cols = size.width, rows = size.height, "resize");
                self.hand_over(size)
                    .await
                    .map(|()| 0)
                    .map_err(|e| terminate(buf, e))
            }
            Some(Operation::Ping) => Ok(0),
            Some(Operation::Stdout) | None => {
                warn!(session_id = %self.id, operation = %msg.operation, "unknown message type");
                Err(terminate(buf, TerminalError::UnknownOperation(msg.operation)))
            }
        }
    }

    /// Send process output to the browser as one `stdout` frame.
    ///
    /// Bytes that do not form valid UTF-8 (typically a character split at a
    /// chunk boundary) are dropped first. On success the full input length
    /// is reported as written, even when sanitizing shortened the payload.
    pub async fn write(&self, bytes: &[u8]) -> Result<usize> {
        let text = utf8::sanitize(bytes);
        let frame = serde_json::to_string(&TerminalMessage::stdout(text)).map_err(|e| {
            warn!(session_id = %self.id, error = %e, "write encode message failed");
            TerminalError::Encode(e)
        })?;

        let mut sink = self.sink.lock().await;
        sink.send_text(frame).await.map_err(|e| {
            warn!(session_id = %self.id, error = %e, "write message failed");
            e
        })?;
        Ok(bytes.len())
    }

    /// Wait for the next resize. `None` once [`done`](Self::done) has fired.
    pub async fn next(&self) -> Option<TerminalSize> {
        let mut rx = tokio::select! {
            biased;
            _ = self.done.cancelled() => return None,
            rx = self.resize_rx.lock() => rx,
        };

        tokio::select! {
            biased;
            _ = self.done.cancelled() => None,
            handoff = rx.recv() => {
                let handoff = handoff?;
                let _ = handoff.taken.send(());
                Some(handoff.size)
            }
        }
    }

    /// Signal that the session is over: pending and future `next` calls
    /// return `None`. Must be called before [`close`](Self::close).
    pub fn done(&self) {
        if self.done.is_cancelled() {
            warn!(session_id = %self.id, "done signalled more than once");
            return;
        }
        self.done.cancel();
        debug!(session_id = %self.id, "session done");
    }

    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Close the WebSocket.
    pub async fn close(&self) -> Result<()> {
        if !self.done.is_cancelled() {
            warn!(session_id = %self.id, "closing session before done was signalled");
        }
        let mut sink = self.sink.lock().await;
        sink.close().await?;
        info!(session_id = %self.id, "session closed");
        Ok(())
    }

    async fn recv_frame(&self) -> Result<Vec<u8>> {
        let mut source = self.source.lock().await;
        match tokio::time::timeout(self.read_timeout, source.recv()).await {
            Err(_) => Err(TerminalError::ReadTimeout {
                ms: self.read_timeout.as_millis() as u64,
            }),
            Ok(None) => Err(TerminalError::ConnectionClosed),
            Ok(Some(frame)) => frame,
        }
    }

    /// Rendezvous with `next`: returns once the size has been taken.
    async fn hand_over(&self, size: TerminalSize) -> Result<()> {
        let (taken, taken_rx) = oneshot::channel();
        let handoff = async move {
            if self
                .resize_tx
                .send(ResizeHandoff { size, taken })
                .await
                .is_err()
            {
                return Err(TerminalError::SessionDone);
            }
            taken_rx.await.map_err(|_| TerminalError::SessionDone)
        };

        tokio::select! {
            biased;
            _ = self.done.cancelled() => Err(TerminalError::SessionDone),
            res = handoff => res,
        }
    }
}

fn copy_into(buf: &mut [u8], src: &[u8]) -> usize {
    let n = buf.len().min(src.len());
    buf[..n].copy_from_slice(&src[..n]);
    n
}

fn terminate(buf: &mut [u8], source: TerminalError) -> ReadError {
    ReadError {
        written: copy_into(buf, END_OF_TRANSMISSION),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::{pair, Browser};
    use std::sync::Arc;

    fn session_with(timeout: Duration) -> (Browser, Arc<TerminalSession>) {
        let (browser, source, sink) = pair();
        let session = TerminalSession::new(
            source,
            sink,
            SessionOptions {
                read_timeout: timeout,
            },
        );
        (browser, Arc::new(session))
    }

    fn session() -> (Browser, Arc<TerminalSession>) {
        session_with(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn stdin_is_copied_into_buffer() {
        let (browser, session) = session();
        browser.send(&TerminalMessage::stdin("ls -la\r"));

        let mut buf = [0u8; 64];
        let n = session.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ls -la\r");
    }

    #[tokio::test]
    async fn stdin_larger_than_buffer_is_truncated() {
        let (browser, session) = session();
        browser.send(&TerminalMessage::stdin("abcdefgh"));

        let mut buf = [0u8; 3];
        let n = session.read(&mut buf).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf, b"abc");
    }

    #[tokio::test]
    async fn resize_is_observed_by_next() {
        let (browser, session) = session();
        browser.send_raw(r#"{"operation":"resize","cols":120,"rows":40}"#);

        let poller = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.next().await })
        };

        let mut buf = [0u8; 16];
        let n = session.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);

        let size = poller.await.unwrap();
        assert_eq!(
            size,
            Some(TerminalSize {
                width: 120,
                height: 40
            })
        );
    }

    #[tokio::test]
    async fn resize_blocks_read_until_consumed() {
        let (browser, session) = session();
        browser.send(&TerminalMessage::resize(80, 24));

        let reader = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let mut buf = [0u8; 16];
                session.read(&mut buf).await.map_err(|e| e.to_string())
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!reader.is_finished(), "read must wait for next()");

        let size = session.next().await.unwrap();
        assert_eq!((size.width, size.height), (80, 24));
        assert_eq!(reader.await.unwrap(), Ok(0));
    }

    #[tokio::test]
    async fn each_resize_is_observed_once() {
        let (browser, session) = session();
        browser.send(&TerminalMessage::resize(100, 30));
        browser.send(&TerminalMessage::resize(101, 31));

        let reader = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let mut buf = [0u8; 16];
                session.read(&mut buf).await.unwrap();
                session.read(&mut buf).await.unwrap();
            })
        };

        assert_eq!(session.next().await.unwrap().width, 100);
        assert_eq!(session.next().await.unwrap().width, 101);
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn ping_is_a_no_op() {
        let (browser, session) = session();
        browser.send(&TerminalMessage::ping());

        let mut buf = [0u8; 16];
        assert_eq!(session.read(&mut buf).await.unwrap(), 0);

        // No resize was queued: next() only returns because of done().
        session.done();
        assert_eq!(session.next().await, None);
    }

    #[tokio::test]
    async fn null_stdin_data_reads_nothing() {
        let (browser, session) = session();
        browser.send_raw(r#"{"operation":"stdin","data":null}"#);
        browser.send(&TerminalMessage::stdin("x"));

        let mut buf = [0u8; 16];
        assert_eq!(session.read(&mut buf).await.unwrap(), 0);
        let n = session.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"x");
    }

    #[tokio::test]
    async fn malformed_json_returns_sentinel() {
        let (browser, session) = session();
        browser.send_raw("{not json");

        let mut buf = [0u8; 16];
        let err = session.read(&mut buf).await.unwrap_err();
        assert_eq!(&buf[..err.written], END_OF_TRANSMISSION);
        assert!(matches!(err.source, TerminalError::Decode(_)));
    }

    #[tokio::test]
    async fn unknown_operation_returns_sentinel() {
        let (browser, session) = session();
        browser.send_raw(r#"{"operation":"bogus"}"#);

        let mut buf = [0u8; 16];
        let err = session.read(&mut buf).await.unwrap_err();
        assert_eq!(err.written, END_OF_TRANSMISSION.len());
        assert_eq!(&buf[..err.written], END_OF_TRANSMISSION);
        assert_eq!(err.to_string(), "unknown message type 'bogus'");
    }

    #[tokio::test]
    async fn inbound_stdout_is_rejected() {
        let (browser, session) = session();
        browser.send(&TerminalMessage::stdout("echo"));

        let mut buf = [0u8; 16];
        let err = session.read(&mut buf).await.unwrap_err();
        assert!(matches!(err.source, TerminalError::UnknownOperation(ref op) if op == "stdout"));
    }

    #[tokio::test]
    async fn transport_error_returns_sentinel() {
        let (browser, session) = session();
        browser.fail(TerminalError::Transport("reset by peer".into()));

        let mut buf = [0u8; 16];
        let err = session.read(&mut buf).await.unwrap_err();
        assert_eq!(&buf[..err.written], END_OF_TRANSMISSION);
        assert!(matches!(err.source, TerminalError::Transport(_)));
    }

    #[tokio::test]
    async fn closed_connection_returns_sentinel() {
        let (mut browser, session) = session();
        browser.hang_up();

        let mut buf = [0u8; 16];
        let err = session.read(&mut buf).await.unwrap_err();
        assert_eq!(&buf[..err.written], END_OF_TRANSMISSION);
        assert!(matches!(err.source, TerminalError::ConnectionClosed));
    }

    #[tokio::test]
    async fn idle_input_hits_read_deadline() {
        let (_browser, session) = session_with(Duration::from_millis(30));

        let mut buf = [0u8; 16];
        let err = session.read(&mut buf).await.unwrap_err();
        assert_eq!(&buf[..err.written], END_OF_TRANSMISSION);
        assert!(matches!(err.source, TerminalError::ReadTimeout { ms: 30 }));
    }

    #[tokio::test]
    async fn deadline_is_rearmed_per_read() {
        let (browser, session) = session_with(Duration::from_millis(200));
        let mut buf = [0u8; 16];

        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            browser.send(&TerminalMessage::ping());
            assert_eq!(session.read(&mut buf).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn write_wraps_output_in_stdout_frame() {
        let (mut browser, session) = session();

        let n = session.write("héllo\r\n$ ".as_bytes()).await.unwrap();
        assert_eq!(n, "héllo\r\n$ ".len());

        let frame = browser.next_frame().await.unwrap();
        assert_eq!(frame.kind(), Some(Operation::Stdout));
        assert_eq!(frame.data, "héllo\r\n$ ");
    }

    #[tokio::test]
    async fn write_reports_original_length_after_sanitizing() {
        let (mut browser, session) = session();
        let bytes = [b'o', b'k', 0xE2, 0x82];

        assert_eq!(session.write(&bytes).await.unwrap(), 4);
        assert_eq!(
            browser.next_text().await.unwrap(),
            r#"{"operation":"stdout","data":"ok"}"#
        );
    }

    #[tokio::test]
    async fn write_to_gone_browser_fails() {
        let (mut browser, session) = session();
        browser.stop_reading();

        let err = session.write(b"lost").await.unwrap_err();
        assert!(matches!(err, TerminalError::Transport(_)));
    }

    #[tokio::test]
    async fn done_unblocks_pending_next() {
        let (_browser, session) = session();
        let poller = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.next().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!poller.is_finished());

        session.done();
        assert_eq!(poller.await.unwrap(), None);
        // ...and every later call too.
        assert_eq!(session.next().await, None);
    }

    #[tokio::test]
    async fn next_blocks_without_done() {
        let (_browser, session) = session();
        let res = tokio::time::timeout(Duration::from_millis(50), session.next()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn done_releases_read_stuck_in_resize() {
        let (browser, session) = session();
        browser.send(&TerminalMessage::resize(80, 24));

        let reader = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let mut buf = [0u8; 16];
                session.read(&mut buf).await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        session.done();

        let err = reader.await.unwrap().unwrap_err();
        assert!(matches!(err.source, TerminalError::SessionDone));
        assert_eq!(err.written, END_OF_TRANSMISSION.len());
    }

    #[tokio::test]
    async fn second_done_is_harmless() {
        let (_browser, session) = session();
        session.done();
        session.done();
        assert!(session.is_done());
    }

    #[tokio::test]
    async fn close_closes_the_transport() {
        let (browser, session) = session();
        session.done();
        session.close().await.unwrap();
        assert!(browser.is_closed());
        assert!(matches!(
            session.write(b"late").await,
            Err(TerminalError::ConnectionClosed)
        ));
    }
}

//! Session Handler Module
//!
//! This module runs one shell session over an async byte stream: the
//! process's stdin/stdout, or a TCP client of the serial bridge. Each
//! session gets its own handler task that runs in a loop, reading lines
//! and writing responses.
//!
//! ## Session Lifecycle
//!
//! ```text
//! 1. Session starts (stdin opened / TCP client accepted)
//!        │
//!        ▼
//! 2. ConnectionHandler created
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read bytes from stream  │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Split off complete line │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Shell::execute_line     │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Write response          │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. End of input / error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Buffer Management
//!
//! Incoming data accumulates in a BytesMut buffer. A read may deliver part
//! of a line or several lines at once. Lines end in `\n` with an optional
//! `\r` before it. A line longer than [`MAX_LINE_LENGTH`], not counting the
//! terminator, is reported once and discarded up to its terminator.
//!
//! ## Blocking Dispatch
//!
//! A snapshot-backed store rewrites its file while holding its lock, so each
//! line is executed on Tokio's blocking pool rather than a runtime worker.

use crate::connection::shell::Shell;
use crate::storage::{PreferenceStore, StorageEngine};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Longest accepted input line in bytes (8 KB)
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 1024;

/// One unit of input split off the buffer.
enum Line {
    Complete(String),
    TooLong,
}

/// Statistics for session handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of sessions started
    pub connections_accepted: AtomicU64,
    /// Currently active sessions
    pub active_connections: AtomicU64,
    /// Total non-blank lines executed
    pub commands_processed: AtomicU64,
    /// Lines discarded for exceeding the length limit
    pub lines_discarded: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn line_discarded(&self) {
        self.lines_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single shell session.
///
/// This struct manages the read buffer, line splitting, and response
/// writing for one input/output stream pair.
pub struct ConnectionHandler<R, W, S: PreferenceStore + ?Sized = StorageEngine> {
    /// Input side of the session
    reader: R,

    /// Output side of the session
    writer: BufWriter<W>,

    /// Peer name (for logging)
    peer: String,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// True while skipping the rest of an overlong line
    discarding: bool,

    /// The shell (shared across sessions)
    shell: Shell<S>,

    /// Session statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<R, W, S> ConnectionHandler<R, W, S>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: PreferenceStore + ?Sized + 'static,
{
    /// Creates a new session handler.
    ///
    /// # Arguments
    ///
    /// * `reader` - Where input lines come from
    /// * `writer` - Where responses go
    /// * `peer` - Name of the other end, for logging
    /// * `shell` - The shell executing each line
    /// * `stats` - Shared session statistics
    pub fn new(
        reader: R,
        writer: W,
        peer: impl Into<String>,
        shell: Shell<S>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            reader,
            writer: BufWriter::new(writer),
            peer: peer.into(),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            discarding: false,
            shell,
            stats,
        }
    }

    /// Runs the session until end of input or an I/O error.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(peer = %self.peer, "Session started");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(peer = %self.peer, "Session ended"),
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(peer = %self.peer, "Connection reset by peer")
            }
            Err(e) => warn!(peer = %self.peer, error = %e, "Session error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(line) = self.next_line() {
                match line {
                    Line::Complete(text) => self.execute_line(&text).await?,
                    Line::TooLong => self.report_overlong_line().await?,
                }
            }

            // No terminator buffered yet
            if self.discarding {
                self.buffer.clear();
            } else if content_len(&self.buffer) > MAX_LINE_LENGTH {
                self.buffer.clear();
                self.discarding = true;
                self.report_overlong_line().await?;
            }

            if self.read_more_data().await? == 0 {
                // A final line without a terminator still runs
                if !self.buffer.is_empty() && !self.discarding {
                    let mut line = self.buffer.split();
                    if line.last() == Some(&b'\r') {
                        line.truncate(line.len() - 1);
                    }
                    let line = String::from_utf8_lossy(&line).into_owned();
                    self.execute_line(&line).await?;
                }
                return Ok(());
            }
        }
    }

    /// Splits the next complete line off the buffer.
    fn next_line(&mut self) -> Option<Line> {
        loop {
            let pos = self.buffer.iter().position(|&b| b == b'\n')?;
            let mut line = self.buffer.split_to(pos + 1);

            if self.discarding {
                // Tail of an overlong line
                self.discarding = false;
                continue;
            }
            line.truncate(pos);
            if content_len(&line) > MAX_LINE_LENGTH {
                return Some(Line::TooLong);
            }
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }

            trace!(
                peer = %self.peer,
                length = line.len(),
                remaining = self.buffer.len(),
                "Split line"
            );
            return Some(Line::Complete(String::from_utf8_lossy(&line).into_owned()));
        }
    }

    async fn report_overlong_line(&mut self) -> Result<(), ConnectionError> {
        self.stats.line_discarded();
        warn!(peer = %self.peer, limit = MAX_LINE_LENGTH, "Input line too long, discarding");

        let message = format!("ERROR: input line exceeds {} bytes\r\n", MAX_LINE_LENGTH);
        self.send_response(message.as_bytes()).await
    }

    async fn execute_line(&mut self, line: &str) -> Result<(), ConnectionError> {
        let shell = self.shell.clone();
        let owned = line.to_owned();
        let (handled, response) = tokio::task::spawn_blocking(move || {
            let mut response = Vec::new();
            shell
                .execute_line(&owned, &mut response)
                .map(|handled| (handled, response))
        })
        .await??;

        if !handled {
            return Ok(());
        }

        self.stats.command_processed();
        debug!(peer = %self.peer, line = %line, "Executed line");

        if !response.is_empty() {
            self.send_response(&response).await?;
        }
        Ok(())
    }

    /// Reads more data into the buffer, returning the number of bytes read.
    async fn read_more_data(&mut self) -> Result<usize, ConnectionError> {
        if self.buffer.capacity() - self.buffer.len() < 256 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.reader.read_buf(&mut self.buffer).await?;
        if n > 0 {
            self.stats.bytes_read(n);
            trace!(peer = %self.peer, bytes = n, "Read data");
        }
        Ok(n)
    }

    /// Writes a response and flushes it.
    async fn send_response(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(peer = %self.peer, bytes = bytes.len(), "Sent response");
        Ok(())
    }
}

/// Length of a buffered line without a trailing `\r`.
fn content_len(line: &[u8]) -> usize {
    match line.last() {
        Some(b'\r') => line.len() - 1,
        _ => line.len(),
    }
}

/// Errors that can occur while running a session.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error on the session's stream
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The blocking task executing a line panicked or was cancelled
    #[error("command task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Runs a shell session for a TCP client of the serial bridge.
///
/// # Arguments
///
/// * `stream` - The TCP stream for this client
/// * `addr` - The client's socket address
/// * `shell` - The shell executing each line
/// * `stats` - Shared session statistics
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    shell: Shell,
    stats: Arc<ConnectionStats>,
) {
    let (reader, writer) = stream.into_split();
    let handler = ConnectionHandler::new(reader, writer, addr.to_string(), shell, stats);
    if let Err(e) = handler.run().await {
        debug!(client = %addr, error = %e, "Connection ended with error");
    }
}

/// Runs a shell session on the process's stdin and stdout.
pub async fn run_stdio(shell: Shell, stats: Arc<ConnectionStats>) -> Result<(), ConnectionError> {
    ConnectionHandler::new(tokio::io::stdin(), tokio::io::stdout(), "stdio", shell, stats)
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::PreferencesCli;
    use crate::storage::{PreferenceType, StoredValue, Unsupported};
    use std::sync::{mpsc, Mutex};
    use tokio::net::TcpListener;

    fn test_shell() -> Shell {
        let cli = PreferencesCli::new(Arc::new(StorageEngine::new()), Arc::new(Unsupported));
        Shell::new(cli)
    }

    /// Feeds `input` through a session and returns everything it wrote.
    async fn run_session<S: PreferenceStore + ?Sized + 'static>(
        shell: Shell<S>,
        stats: Arc<ConnectionStats>,
        input: &[u8],
    ) -> String {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);

        let session = tokio::spawn(
            ConnectionHandler::new(server_read, server_write, "test", shell, stats).run(),
        );

        client.write_all(input).await.unwrap();
        client.shutdown().await.unwrap();

        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();
        session.await.unwrap().unwrap();

        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_mock_session() {
        let reader = tokio_test::io::Builder::new()
            .read(b"setp ns k Int32 42\r\n")
            .read(b"getp ns k Int32\r\n")
            .build();
        let writer = tokio_test::io::Builder::new()
            .write(b"'42' stored as a Int32 (4 Bytes) in ns/k\r\n")
            .write(b"42\r\n")
            .build();

        let stats = Arc::new(ConnectionStats::new());
        ConnectionHandler::new(reader, writer, "mock", test_shell(), Arc::clone(&stats))
            .run()
            .await
            .unwrap();

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_split_and_pipelined_lines() {
        let stats = Arc::new(ConnectionStats::new());
        let output = run_session(
            test_shell(),
            stats,
            b"setp ns a Int8 1\nsetp ns b Int8 2\r\n\r\ngetp ns a Int8\ngetp ns b Int8",
        )
        .await;

        assert_eq!(
            output,
            "'1' stored as a Int8 (1 Bytes) in ns/a\r\n\
             '2' stored as a Int8 (1 Bytes) in ns/b\r\n\
             1\r\n\
             2\r\n"
        );
    }

    #[tokio::test]
    async fn test_parse_error_line() {
        let stats = Arc::new(ConnectionStats::new());
        let output = run_session(test_shell(), stats, b"bogus\n").await;
        assert_eq!(output, "ERROR: unknown command 'bogus'\r\n");
    }

    #[tokio::test]
    async fn test_overlong_line_is_discarded() {
        let stats = Arc::new(ConnectionStats::new());

        let mut input = b"setp ns s String ".to_vec();
        input.extend(std::iter::repeat(b'x').take(MAX_LINE_LENGTH * 2));
        input.extend_from_slice(b"\ngetp ns s\n");

        let output = run_session(test_shell(), Arc::clone(&stats), &input).await;

        assert_eq!(
            output,
            format!(
                "ERROR: input line exceeds {} bytes\r\n\
                 ERROR: unable to locate key 's' in namespace 'ns'\r\n",
                MAX_LINE_LENGTH
            )
        );
        assert_eq!(stats.lines_discarded.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_line_limit_excludes_terminator() {
        let mut line = b"getp ns k".to_vec();
        line.resize(MAX_LINE_LENGTH, b' ');

        for terminator in [&b"\n"[..], &b"\r\n"[..]] {
            let mut input = line.clone();
            input.extend_from_slice(terminator);

            let stats = Arc::new(ConnectionStats::new());
            let output = run_session(test_shell(), Arc::clone(&stats), &input).await;
            assert_eq!(output, "ERROR: unable to locate key 'k' in namespace 'ns'\r\n");
            assert_eq!(stats.lines_discarded.load(Ordering::Relaxed), 0);
        }

        line.push(b' ');
        line.extend_from_slice(b"\r\n");
        let output = run_session(test_shell(), Arc::new(ConnectionStats::new()), &line).await;
        assert_eq!(
            output,
            format!("ERROR: input line exceeds {} bytes\r\n", MAX_LINE_LENGTH)
        );
    }

    /// An engine whose writes wait until the test releases them.
    struct GatedStore {
        inner: StorageEngine,
        entered: tokio::sync::mpsc::UnboundedSender<()>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl PreferenceStore for GatedStore {
        fn begin(&self, namespace: &str, read_only: bool) -> bool {
            self.inner.begin(namespace, read_only)
        }

        fn end(&self, namespace: &str) {
            self.inner.end(namespace)
        }

        fn is_key(&self, namespace: &str, key: &str) -> bool {
            self.inner.is_key(namespace, key)
        }

        fn get_type(&self, namespace: &str, key: &str) -> PreferenceType {
            self.inner.get_type(namespace, key)
        }

        fn get_bytes_length(&self, namespace: &str, key: &str) -> usize {
            self.inner.get_bytes_length(namespace, key)
        }

        fn get(&self, namespace: &str, key: &str) -> Option<StoredValue> {
            self.inner.get(namespace, key)
        }

        fn put(&self, namespace: &str, key: &str, value: StoredValue) -> usize {
            let _ = self.entered.send(());
            let _ = self.release.lock().unwrap().recv();
            self.inner.put(namespace, key, value)
        }

        fn remove(&self, namespace: &str, key: &str) -> bool {
            self.inner.remove(namespace, key)
        }

        fn clear(&self, namespace: &str) -> bool {
            self.inner.clear(namespace)
        }
    }

    #[tokio::test]
    async fn test_blocked_store_leaves_runtime_free() {
        let (entered_tx, mut entered_rx) = tokio::sync::mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(GatedStore {
            inner: StorageEngine::new(),
            entered: entered_tx,
            release: Mutex::new(release_rx),
        });
        let shell = Shell::new(PreferencesCli::new(store, Arc::new(Unsupported)));

        let session = tokio::spawn(run_session(
            shell,
            Arc::new(ConnectionStats::new()),
            b"setp ns k Int8 1\n",
        ));

        // Only reachable while the write is parked off the runtime thread
        entered_rx.recv().await.unwrap();
        release_tx.send(()).unwrap();

        assert_eq!(
            session.await.unwrap(),
            "'1' stored as a Int8 (1 Bytes) in ns/k\r\n"
        );
    }

    #[tokio::test]
    async fn test_session_stats() {
        let stats = Arc::new(ConnectionStats::new());
        run_session(test_shell(), Arc::clone(&stats), b"\nhelp\n\nsetp ns k Bool 1\n").await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 2);
        assert!(stats.bytes_read.load(Ordering::Relaxed) > 0);
        assert!(stats.bytes_written.load(Ordering::Relaxed) > 0);
    }

    async fn create_test_server() -> (SocketAddr, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shell = test_shell();
        let stats = Arc::new(ConnectionStats::new());

        let stats_clone = Arc::clone(&stats);
        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(stream, client_addr, shell.clone(), stats));
            }
        });

        (addr, stats)
    }

    #[tokio::test]
    async fn test_tcp_clients_share_store() {
        let (addr, stats) = create_test_server().await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        first.write_all(b"setp wifi ssid String home\r\n").await.unwrap();

        let mut buf = [0u8; 128];
        let n = first.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"'home' stored as a String (4 Bytes) in wifi/ssid\r\n");

        let mut second = TcpStream::connect(addr).await.unwrap();
        second.write_all(b"getp wifi ssid String\r\n").await.unwrap();
        let n = second.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"home\r\n");

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 2);

        drop(first);
        drop(second);
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}

//! Trade stream connection lifecycle.
//!
//! [`StreamClient`] owns one background task per session. The task delays
//! the first connect, opens the socket under a connect watchdog, decodes
//! frames in arrival order, and reconnects with exponential backoff until
//! the attempt budget is used up. A caller-initiated
//! [`disconnect`](StreamClient::disconnect) cancels whatever the task is
//! waiting on, including a pending reconnect, and never triggers another
//! attempt.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tungstenite::Message;

use super::backoff::Backoff;
use super::handler::{Frame, handle_frame};
use super::{WsReader, WsWriter, connect};
use crate::Result;
use crate::config::StreamConfig;
use crate::error::FeedError;
use crate::models::{ConnectionStatus, Trade};

/// How long [`StreamClient::disconnect`] waits for the task to wind down.
const DISCONNECT_GRACE: Duration = Duration::from_secs(5);

/// Events delivered to the injected sink.
#[derive(Debug)]
pub enum StreamEvent {
    /// The connection indicator changed.
    Status(ConnectionStatus),
    /// A trade frame was decoded.
    Trade(Trade),
    /// A fault worth reporting: bad frame, failed connect, socket error,
    /// or [`FeedError::Exhausted`].
    Error(FeedError),
}

/// Where the session task currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Not started, or waiting out the initial connect delay.
    Idle = 0,
    Connecting = 1,
    Open = 2,
    /// Waiting out a backoff delay before the next attempt.
    Reconnecting = 3,
    /// Reconnect attempts exhausted; needs [`StreamClient::restart`].
    Failed = 4,
    /// Shut down by the caller.
    Closed = 5,
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::Reconnecting,
            4 => Self::Failed,
            5 => Self::Closed,
            _ => Self::Idle,
        }
    }
}

/// Commands sent from the client handle to the session task.
enum Command {
    /// Serialized JSON to send as a text frame.
    Send(String),
    Disconnect,
}

/// Why the reader loop exited.
enum DisconnectReason {
    /// The connection was closed by the server, ended, or errored.
    ConnectionLost,
    /// The caller asked to disconnect, or dropped the client.
    Shutdown,
}

/// Client for the binary trade stream.
///
/// Construct one per consumer; events go to the sink passed to
/// [`new`](Self::new).
pub struct StreamClient {
    config: StreamConfig,
    events: mpsc::UnboundedSender<StreamEvent>,
    cmd_tx: Option<mpsc::UnboundedSender<Command>>,
    task: Option<JoinHandle<()>>,
    state: Arc<AtomicU8>,
}

impl StreamClient {
    /// Creates a client. Does not connect yet.
    #[must_use]
    pub fn new(config: StreamConfig, events: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self {
            config,
            events,
            cmd_tx: None,
            task: None,
            state: Arc::new(AtomicU8::new(ConnectionState::Idle as u8)),
        }
    }

    /// Starts a session: the first connect attempt happens after the
    /// configured connect delay.
    ///
    /// Does nothing if a session is already running, so at most one
    /// connection attempt is ever in flight.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!(state = ?self.state(), "Stream session already running");
            return;
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        self.state
            .store(ConnectionState::Idle as u8, Ordering::SeqCst);

        let session = Session {
            backoff: Backoff::new(
                self.config.reconnect_floor,
                self.config.reconnect_ceiling,
                self.config.max_reconnect_attempts,
            ),
            config: self.config.clone(),
            events: self.events.clone(),
            cmd_rx,
            state: Arc::clone(&self.state),
        };

        self.cmd_tx = Some(cmd_tx);
        self.task = Some(tokio::spawn(session.run()));
    }

    /// Closes the socket and ends the session.
    ///
    /// Pending connect attempts and reconnect timers are cancelled; no
    /// automatic reconnect follows.
    pub async fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Disconnect);
        }

        if let Some(mut handle) = self.task.take()
            && tokio::time::timeout(DISCONNECT_GRACE, &mut handle)
                .await
                .is_err()
        {
            warn!("Stream task did not stop in time, aborting");
            handle.abort();
        }

        self.state
            .store(ConnectionState::Closed as u8, Ordering::SeqCst);
    }

    /// Tears down the current session and starts a fresh one with a reset
    /// attempt counter.
    pub async fn restart(&mut self) {
        info!("Restarting trade stream");
        self.disconnect().await;
        self.start();
    }

    /// Serializes `message` as JSON and sends it as a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotConnected`] if the socket is not open, or
    /// [`FeedError::Json`] if serialization fails.
    pub fn send<T: Serialize>(&self, message: &T) -> Result<()> {
        if !self.is_connected() {
            warn!("Cannot send, trade stream is not connected");
            return Err(FeedError::NotConnected);
        }

        let json = serde_json::to_string(message)?;
        self.cmd_tx
            .as_ref()
            .ok_or(FeedError::NotConnected)?
            .send(Command::Send(json))
            .map_err(|_| FeedError::NotConnected)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    /// Whether the socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}

/// State owned by one session task.
struct Session {
    config: StreamConfig,
    events: mpsc::UnboundedSender<StreamEvent>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    state: Arc<AtomicU8>,
    backoff: Backoff,
}

impl Session {
    fn emit(&self, event: StreamEvent) {
        let _ = self.events.send(event);
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    async fn run(mut self) {
        if self
            .until_shutdown(tokio::time::sleep(self.config.connect_delay))
            .await
            .is_none()
        {
            self.set_state(ConnectionState::Closed);
            return;
        }

        loop {
            self.set_state(ConnectionState::Connecting);
            self.emit(StreamEvent::Status(ConnectionStatus::Connecting));
            info!(url = %self.config.websocket_url, "Connecting to trade stream");

            let attempt = open_socket(
                self.config.websocket_url.clone(),
                self.config.connect_timeout,
            );
            let Some(attempt) = self.until_shutdown(attempt).await else {
                break;
            };

            match attempt {
                Ok((write, read)) => {
                    self.backoff.reset();
                    self.set_state(ConnectionState::Open);
                    self.emit(StreamEvent::Status(ConnectionStatus::Connected));
                    info!("Trade stream connected");

                    let reason = self.read_loop(write, read).await;
                    self.emit(StreamEvent::Status(ConnectionStatus::Disconnected));
                    if let DisconnectReason::Shutdown = reason {
                        info!("Trade stream shut down");
                        break;
                    }
                }
                Err(e) => {
                    error!("Trade stream connection failed: {e}");
                    self.emit(StreamEvent::Error(e));
                    self.emit(StreamEvent::Status(ConnectionStatus::Disconnected));
                }
            }

            match self.backoff.next_delay() {
                Some(delay) => {
                    self.set_state(ConnectionState::Reconnecting);
                    info!(
                        attempt = self.backoff.attempts(),
                        max_attempts = self.backoff.max_attempts(),
                        backoff_ms = delay.as_millis() as u64,
                        "Backing off before reconnect"
                    );
                    if self
                        .until_shutdown(tokio::time::sleep(delay))
                        .await
                        .is_none()
                    {
                        break;
                    }
                }
                None => {
                    error!("Max reconnection attempts reached");
                    self.set_state(ConnectionState::Failed);
                    self.emit(StreamEvent::Error(FeedError::Exhausted {
                        attempts: self.backoff.max_attempts(),
                    }));
                    return;
                }
            }
        }

        self.set_state(ConnectionState::Closed);
    }

    /// Drives `fut` to completion unless a disconnect arrives first, in
    /// which case `fut` is dropped and `None` is returned.
    async fn until_shutdown<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                out = &mut fut => return Some(out),
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Send(_)) => warn!("Dropping outbound message, trade stream not open"),
                    Some(Command::Disconnect) | None => return None,
                },
            }
        }
    }

    /// Reads frames in arrival order until the connection drops or the
    /// caller disconnects.
    async fn read_loop(&mut self, mut write: WsWriter, mut read: WsReader) -> DisconnectReason {
        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(message)) => match handle_frame(message) {
                            Ok(Frame::Trade(trade)) => self.emit(StreamEvent::Trade(trade)),
                            Ok(Frame::Ignored) => {}
                            Ok(Frame::Closed { code, reason }) => {
                                info!(?code, reason = %reason, "Trade stream closed by server");
                                return DisconnectReason::ConnectionLost;
                            }
                            Err(e @ FeedError::Protocol(_)) => warn!("Ignoring frame: {e}"),
                            Err(e) => {
                                warn!("Failed to decode trade frame: {e}");
                                self.emit(StreamEvent::Error(e));
                            }
                        },
                        Some(Err(e)) => {
                            error!("Trade stream error: {e}");
                            self.emit(StreamEvent::Error(e.into()));
                            return DisconnectReason::ConnectionLost;
                        }
                        None => {
                            warn!("Trade stream ended");
                            return DisconnectReason::ConnectionLost;
                        }
                    }
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Send(json)) => {
                            if let Err(e) = write.send(Message::Text(json.into())).await {
                                warn!("Failed to send message: {e}");
                            }
                        }
                        Some(Command::Disconnect) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            return DisconnectReason::Shutdown;
                        }
                    }
                }
            }
        }
    }
}

/// Opens one socket, abandoning it if the handshake outlives `limit`.
async fn open_socket(url: String, limit: Duration) -> Result<(WsWriter, WsReader)> {
    match tokio::time::timeout(limit, connect(&url)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(url = %url, "Trade stream connect timed out, closing");
            Err(FeedError::ConnectTimeout(limit))
        }
    }
}

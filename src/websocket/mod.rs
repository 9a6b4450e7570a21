//! Async WebSocket client for the binary trade stream.
//!
//! This module is organized by concern:
//! - [`connection`] - [`StreamClient`] lifecycle, reconnection and shutdown
//! - [`handler`] - Classification and decoding of incoming frames
//! - [`backoff`] - Reconnect delay schedule

pub mod backoff;
pub mod connection;
mod handler;

use futures_util::StreamExt;
use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::info;
use tungstenite::Message;

use crate::Result;

pub use backoff::Backoff;
pub use connection::{ConnectionState, StreamClient, StreamEvent};

/// Write half of a stream connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a stream connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns a [`FeedError`](crate::FeedError) if the connection or TLS handshake fails.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let (ws_stream, _) = connect_async(url).await?;
    info!(url = %url, "WebSocket handshake completed");

    Ok(ws_stream.split())
}

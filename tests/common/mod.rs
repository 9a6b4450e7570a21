//! Shared test utilities: record encoders and loopback upstream servers.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use candlefeed::config::{HttpConfig, StreamConfig};
use candlefeed::{Candle, Trade};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tungstenite::Message;

/// Upper bound for any single wait in the async tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub fn candle(timestamp: i64, close: f64) -> Candle {
    Candle {
        open_price: close - 1.0,
        close_price: close,
        high_price: close + 2.0,
        low_price: close - 2.0,
        volume_in: 1.5,
        volume_out: close * 1.5,
        timestamp,
    }
}

pub fn candle_bytes(c: &Candle) -> Vec<u8> {
    let mut out = Vec::with_capacity(Candle::LEN);
    for v in [
        c.open_price,
        c.close_price,
        c.high_price,
        c.low_price,
        c.volume_in,
        c.volume_out,
    ] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&c.timestamp.to_le_bytes());
    out
}

pub fn candles_bytes(candles: &[Candle]) -> Vec<u8> {
    candles.iter().flat_map(candle_bytes).collect()
}

pub fn trade(trade_time: i64, price: f64) -> Trade {
    Trade {
        trade_time,
        amount_in: 0.25,
        amount_out: 0.25 * price,
        price,
    }
}

pub fn trade_bytes(t: &Trade) -> Vec<u8> {
    let mut out = Vec::with_capacity(Trade::LEN);
    out.extend_from_slice(&t.trade_time.to_le_bytes());
    out.extend_from_slice(&t.amount_in.to_le_bytes());
    out.extend_from_slice(&t.amount_out.to_le_bytes());
    out.extend_from_slice(&t.price.to_le_bytes());
    out
}

/// One canned HTTP response keyed by request path.
#[derive(Clone)]
pub struct Route {
    pub path: &'static str,
    pub status: u16,
    pub body: Vec<u8>,
}

impl Route {
    pub fn ok(path: &'static str, body: Vec<u8>) -> Self {
        Self {
            path,
            status: 200,
            body,
        }
    }

    pub fn status(path: &'static str, status: u16) -> Self {
        Self {
            path,
            status,
            body: Vec::new(),
        }
    }
}

/// Serves canned HTTP/1.1 responses on a loopback port. Unknown paths get 404.
pub async fn serve_http(routes: Vec<Route>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                let _ = respond(socket, &routes).await;
            });
        }
    });

    addr
}

async fn respond(mut socket: TcpStream, routes: &[Route]) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&request);
    let path = head.split_whitespace().nth(1).unwrap_or("/");
    let (status, body) = routes
        .iter()
        .find(|r| r.path == path)
        .map(|r| (r.status, r.body.clone()))
        .unwrap_or((404, Vec::new()));

    let header = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reason(status),
        body.len()
    );
    socket.write_all(header.as_bytes()).await?;
    socket.write_all(&body).await?;
    socket.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// What the loopback WebSocket server does with the n-th connection.
#[derive(Clone)]
pub enum Script {
    /// Send the frames, then keep the connection open until the client leaves.
    SendAndHold(Vec<Message>),
    /// Send the frames, then close the connection.
    SendAndClose(Vec<Message>),
}

/// Serves WebSocket connections, running `scripts[n]` for the n-th
/// connection (the last script repeats). Returns the address and a counter
/// of accepted connections.
pub async fn serve_ws(scripts: Vec<Script>) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let script = scripts[index.min(scripts.len() - 1)].clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
                    return;
                };
                match script {
                    Script::SendAndHold(frames) => {
                        for frame in frames {
                            let _ = ws.send(frame).await;
                        }
                        while let Some(Ok(_)) = ws.next().await {}
                    }
                    Script::SendAndClose(frames) => {
                        for frame in frames {
                            let _ = ws.send(frame).await;
                        }
                        let _ = ws.close(None).await;
                    }
                }
            });
        }
    });

    (addr, accepted)
}

/// Accepts TCP connections but never answers the WebSocket handshake.
pub async fn serve_silent() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn http_config(addr: SocketAddr) -> HttpConfig {
    HttpConfig {
        base_url: format!("http://{addr}"),
        timeout: Duration::from_secs(2),
        ..HttpConfig::default()
    }
}

/// Stream settings with test-sized delays.
pub fn stream_config(addr: SocketAddr) -> StreamConfig {
    StreamConfig {
        websocket_url: format!("ws://{addr}"),
        connect_timeout: Duration::from_secs(2),
        connect_delay: Duration::ZERO,
        reconnect_floor: Duration::from_millis(10),
        reconnect_ceiling: Duration::from_millis(40),
        max_reconnect_attempts: 5,
    }
}

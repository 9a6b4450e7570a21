//! Incoming frame processing.

use tracing::debug;
use tungstenite::Message;

use crate::Result;
use crate::codec::decode_trade;
use crate::error::FeedError;
use crate::models::Trade;

/// Number of leading bytes logged for each binary frame.
const LOGGED_PREFIX: usize = 16;

/// What a single frame means to the connection loop.
#[derive(Debug, PartialEq)]
pub(crate) enum Frame {
    /// A decoded trade record.
    Trade(Trade),
    /// The server closed the connection.
    Closed { code: Option<u16>, reason: String },
    /// Control frames that need no action.
    Ignored,
}

/// Classifies one frame, decoding binary payloads into trades.
///
/// # Errors
///
/// Returns [`FeedError::Format`] for binary frames that are not exactly one
/// trade record, and [`FeedError::Protocol`] for text frames.
pub(crate) fn handle_frame(message: Message) -> Result<Frame> {
    match message {
        Message::Binary(data) => {
            debug!(
                bytes = data.len(),
                prefix = ?&data[..data.len().min(LOGGED_PREFIX)],
                "Received binary frame"
            );
            Ok(Frame::Trade(decode_trade(&data)?))
        }
        Message::Text(text) => Err(FeedError::Protocol(format!(
            "unexpected text frame ({} bytes)",
            text.len()
        ))),
        Message::Close(frame) => Ok(match frame {
            Some(f) => Frame::Closed {
                code: Some(f.code.into()),
                reason: f.reason.to_string(),
            },
            None => Frame::Closed {
                code: None,
                reason: String::new(),
            },
        }),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(Frame::Ignored),
    }
}

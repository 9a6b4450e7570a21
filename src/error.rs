//! Crate-level error types.
//!
//! [`FeedError`] unifies every error source (configuration, decoding, HTTP,
//! WebSocket, JSON) behind a single enum so callers can match on the variant
//! they care about while still using the `?` operator for easy propagation.
//! [`ErrorKind`] folds the variants into the four fault classes the pipeline
//! reasons about when deciding whether to swallow, report, or reconnect.

use std::fmt;
use std::time::Duration;

use crate::codec::DecodeError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// An environment variable held an unusable value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A binary buffer did not match the fixed record layout.
    #[error("format error: {0}")]
    Format(#[from] DecodeError),

    /// An HTTP request failed or returned a non-success status.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The socket did not open before the connect watchdog fired.
    #[error("websocket connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The server sent a frame type the feed does not speak.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON serialization of an outbound message failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reconnection gave up after the configured number of attempts.
    #[error("failed to reconnect after {attempts} attempts")]
    Exhausted { attempts: u32 },

    /// An outbound message was sent while no socket was open.
    #[error("websocket is not connected")]
    NotConnected,
}

/// Fault classes used to route errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    /// Malformed or mis-sized binary input.
    Format,
    /// HTTP or socket-level failure, including timeouts.
    Transport,
    /// Unexpected frame type or unserializable outbound message.
    Protocol,
    /// Reconnect attempts used up; needs caller intervention.
    Exhausted,
}

impl FeedError {
    /// Returns the fault class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Format(_) => ErrorKind::Format,
            Self::Http(_) | Self::WebSocket(_) | Self::ConnectTimeout(_) | Self::NotConnected => {
                ErrorKind::Transport
            }
            Self::Protocol(_) | Self::Json(_) => ErrorKind::Protocol,
            Self::Exhausted { .. } => ErrorKind::Exhausted,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Format => "format",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// A cloneable snapshot of a [`FeedError`], suitable for fanning out to
/// several subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedAlert {
    pub kind: ErrorKind,
    pub message: String,
}

impl FeedAlert {
    /// Whether the alert should be surfaced to the user as actionable.
    ///
    /// Only exhaustion qualifies; everything else is transient.
    pub fn is_actionable(&self) -> bool {
        self.kind == ErrorKind::Exhausted
    }
}

impl From<&FeedError> for FeedAlert {
    fn from(err: &FeedError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for FeedAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_fault_classes() {
        let format = FeedError::from(DecodeError::Truncated {
            record: "candle",
            expected: 56,
            actual: 3,
        });
        assert_eq!(format.kind(), ErrorKind::Format);
        assert_eq!(
            FeedError::ConnectTimeout(Duration::from_secs(5)).kind(),
            ErrorKind::Transport
        );
        assert_eq!(FeedError::NotConnected.kind(), ErrorKind::Transport);
        assert_eq!(
            FeedError::Protocol("text frame".into()).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            FeedError::Exhausted { attempts: 5 }.kind(),
            ErrorKind::Exhausted
        );
    }

    #[test]
    fn only_exhaustion_is_actionable() {
        let exhausted = FeedAlert::from(&FeedError::Exhausted { attempts: 5 });
        assert!(exhausted.is_actionable());
        assert_eq!(exhausted.message, "failed to reconnect after 5 attempts");

        let transient = FeedAlert::from(&FeedError::NotConnected);
        assert!(!transient.is_actionable());
        assert_eq!(transient.to_string(), "[transport] websocket is not connected");
    }
}

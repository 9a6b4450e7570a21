//! Typed records carried by the feed.
//!
//! [`Candle`] and [`Trade`] are decoded from the fixed binary layouts in
//! [`crate::codec`]; [`ConnectionStatus`] is what the view layer shows as
//! the connection indicator.

pub mod candle;
pub mod trade;

use serde::Serialize;

pub use candle::Candle;
pub use trade::Trade;

/// Connection indicator states reported to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    /// Returns the lowercase label used by status indicators.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }
}

/// Converts a millisecond timestamp back to whole seconds (floor).
pub fn seconds_from_ms(ms: i64) -> i64 {
    ms.div_euclid(1000)
}

//! Real-time trade record.

use serde::Serialize;

/// A single executed trade pushed over the stream.
///
/// Wire layout (32 bytes, little-endian, no padding):
/// - [0..8]   trade_time (i64, unix seconds)
/// - [8..16]  amount_in (f64)
/// - [16..24] amount_out (f64)
/// - [24..32] price (f64)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trade {
    pub trade_time: i64,
    pub amount_in: f64,
    pub amount_out: f64,
    pub price: f64,
}

impl Trade {
    /// Encoded size of one record in bytes.
    pub const LEN: usize = 32;

    /// Trade time in milliseconds, saturating like [`Candle::time_ms`](super::Candle::time_ms).
    pub fn time_ms(&self) -> i64 {
        self.trade_time.saturating_mul(1000)
    }
}

//! OHLCV candle record.

use serde::Serialize;

/// One aggregation interval of price activity.
///
/// Prices are in quote currency units. No relationship between the price
/// fields is enforced; whatever the upstream sends is kept as-is.
///
/// Wire layout (56 bytes, little-endian, no padding):
/// - [0..8]   open_price (f64)
/// - [8..16]  close_price (f64)
/// - [16..24] high_price (f64)
/// - [24..32] low_price (f64)
/// - [32..40] volume_in (f64)
/// - [40..48] volume_out (f64)
/// - [48..56] timestamp (i64, unix seconds at interval start)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candle {
    pub open_price: f64,
    pub close_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    /// Base-side volume.
    pub volume_in: f64,
    /// Quote-side volume.
    pub volume_out: f64,
    /// Start of the interval, seconds since the unix epoch.
    pub timestamp: i64,
}

impl Candle {
    /// Encoded size of one record in bytes.
    pub const LEN: usize = 56;

    /// Interval start in milliseconds, as most chart libraries expect.
    ///
    /// Saturates for timestamps too large to express in milliseconds.
    pub fn time_ms(&self) -> i64 {
        self.timestamp.saturating_mul(1000)
    }
}

//! Decoder for the fixed-layout binary records shared by the HTTP
//! endpoints and the WebSocket stream.
//!
//! Records are packed back to back with no framing, delimiter or length
//! prefix. Every field is 8 bytes, little-endian, in declaration order (see
//! [`Candle`] and [`Trade`] for the offsets). Decoding is purely structural:
//! NaN prices or negative volumes pass through untouched.

use crate::models::{Candle, Trade};

/// A buffer that does not match the record layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer holds less than one full record.
    #[error("{actual} bytes is shorter than one {record} record ({expected} bytes)")]
    Truncated {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Bytes left over after the last full record.
    #[error("{remainder} trailing bytes after {records} {record} records")]
    TrailingBytes {
        record: &'static str,
        records: usize,
        remainder: usize,
    },

    /// A single-record buffer of the wrong size.
    #[error("expected exactly {expected} bytes for a {record} record, got {actual}")]
    LengthMismatch {
        record: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// A record with a fixed binary layout.
pub trait WireRecord: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;
    /// Human-readable name used in error messages.
    const NAME: &'static str;

    /// Reads one record from a chunk of exactly [`Self::SIZE`] bytes.
    fn read(chunk: &[u8]) -> Self;
}

impl WireRecord for Candle {
    const SIZE: usize = Candle::LEN;
    const NAME: &'static str = "candle";

    fn read(chunk: &[u8]) -> Self {
        Self {
            open_price: read_f64(chunk, 0),
            close_price: read_f64(chunk, 8),
            high_price: read_f64(chunk, 16),
            low_price: read_f64(chunk, 24),
            volume_in: read_f64(chunk, 32),
            volume_out: read_f64(chunk, 40),
            timestamp: read_i64(chunk, 48),
        }
    }
}

impl WireRecord for Trade {
    const SIZE: usize = Trade::LEN;
    const NAME: &'static str = "trade";

    fn read(chunk: &[u8]) -> Self {
        Self {
            trade_time: read_i64(chunk, 0),
            amount_in: read_f64(chunk, 8),
            amount_out: read_f64(chunk, 16),
            price: read_f64(chunk, 24),
        }
    }
}

/// Decodes a buffer of zero or more back-to-back records.
///
/// An empty buffer is the upstream's "no data" signal and yields an empty
/// vector.
///
/// # Errors
///
/// Returns [`DecodeError::Truncated`] if the buffer is non-empty but shorter
/// than one record, and [`DecodeError::TrailingBytes`] if its length is not
/// a multiple of the record size.
pub fn decode_records<R: WireRecord>(bytes: &[u8]) -> Result<Vec<R>, DecodeError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }

    if bytes.len() < R::SIZE {
        return Err(DecodeError::Truncated {
            record: R::NAME,
            expected: R::SIZE,
            actual: bytes.len(),
        });
    }

    let remainder = bytes.len() % R::SIZE;
    if remainder != 0 {
        return Err(DecodeError::TrailingBytes {
            record: R::NAME,
            records: bytes.len() / R::SIZE,
            remainder,
        });
    }

    Ok(bytes.chunks_exact(R::SIZE).map(R::read).collect())
}

/// Decodes a history or latest-candle response body.
///
/// # Errors
///
/// See [`decode_records`].
pub fn decode_candles(bytes: &[u8]) -> Result<Vec<Candle>, DecodeError> {
    decode_records(bytes)
}

/// Decodes one WebSocket frame, which must hold exactly one trade.
///
/// # Errors
///
/// Returns [`DecodeError::Truncated`] for short frames (including empty
/// ones) and [`DecodeError::LengthMismatch`] for oversized frames.
pub fn decode_trade(bytes: &[u8]) -> Result<Trade, DecodeError> {
    if bytes.len() < Trade::SIZE {
        return Err(DecodeError::Truncated {
            record: Trade::NAME,
            expected: Trade::SIZE,
            actual: bytes.len(),
        });
    }
    if bytes.len() != Trade::SIZE {
        return Err(DecodeError::LengthMismatch {
            record: Trade::NAME,
            expected: Trade::SIZE,
            actual: bytes.len(),
        });
    }

    Ok(Trade::read(bytes))
}

#[inline]
fn read_bytes<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut arr = [0u8; N];
    arr.copy_from_slice(&data[offset..offset + N]);
    arr
}

#[inline]
fn read_f64(data: &[u8], offset: usize) -> f64 {
    f64::from_le_bytes(read_bytes::<8>(data, offset))
}

#[inline]
fn read_i64(data: &[u8], offset: usize) -> i64 {
    i64::from_le_bytes(read_bytes::<8>(data, offset))
}

//! Bounded, ordered, deduplicated candle series.
//!
//! [`merge`] reconciles one freshly fetched candle into an existing series.
//! Because it keys on timestamp and re-sorts, the final state does not
//! depend on whether the poller or a replayed fetch saw an interval first.

use crate::models::Candle;

/// Default number of candles kept in memory.
pub const DEFAULT_MAX_CANDLES: usize = 1000;

/// Merges `incoming` into `existing` and returns the new series.
///
/// A candle with the same timestamp is replaced in place, otherwise the
/// candle is appended. The result is sorted ascending by timestamp and
/// trimmed from the front to at most `max_length` entries.
pub fn merge(existing: &[Candle], incoming: Candle, max_length: usize) -> Vec<Candle> {
    let mut updated = existing.to_vec();

    match updated
        .iter()
        .position(|c| c.timestamp == incoming.timestamp)
    {
        Some(index) => updated[index] = incoming,
        None => updated.push(incoming),
    }

    updated.sort_by_key(|c| c.timestamp);
    truncate_front(&mut updated, max_length);
    updated
}

fn truncate_front(candles: &mut Vec<Candle>, max_length: usize) {
    if candles.len() > max_length {
        candles.drain(..candles.len() - max_length);
    }
}

/// The canonical candle series held by the pipeline.
///
/// Invariants: ascending by timestamp, no duplicate timestamps, never longer
/// than `max_len`.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    candles: Vec<Candle>,
    max_len: usize,
}

impl Series {
    /// Creates an empty series bounded to `max_len` candles.
    pub fn new(max_len: usize) -> Self {
        Self {
            candles: Vec::new(),
            max_len,
        }
    }

    /// Builds a series from a history batch.
    ///
    /// The batch is sorted, duplicate timestamps keep the entry that came
    /// last in the batch, and only the newest `max_len` candles are kept.
    pub fn from_candles(mut candles: Vec<Candle>, max_len: usize) -> Self {
        // Stable sort keeps batch order among equal timestamps.
        candles.sort_by_key(|c| c.timestamp);
        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match deduped.last_mut() {
                Some(last) if last.timestamp == candle.timestamp => *last = candle,
                _ => deduped.push(candle),
            }
        }
        truncate_front(&mut deduped, max_len);

        Self {
            candles: deduped,
            max_len,
        }
    }

    /// Returns a new series with `incoming` merged in.
    #[must_use]
    pub fn merged(&self, incoming: Candle) -> Self {
        Self {
            candles: merge(&self.candles, incoming, self.max_len),
            max_len: self.max_len,
        }
    }

    /// Merges `incoming` into this series.
    pub fn merge(&mut self, incoming: Candle) {
        self.candles = merge(&self.candles, incoming, self.max_len);
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// The most recent candle, if any.
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn into_vec(self) -> Vec<Candle> {
        self.candles
    }
}

impl Default for Series {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CANDLES)
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}

//! Events published to the view layer and the subscriber list that fans
//! them out.

use tokio::sync::mpsc;

use crate::error::FeedAlert;
use crate::models::{ConnectionStatus, Trade};
use crate::series::Series;

/// Everything the pipeline tells its consumers.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// The initial history fetch completed (possibly empty).
    HistoryLoaded(Series),
    /// A polled candle was merged into the series.
    CandleUpdated(Series),
    /// A live trade arrived.
    Trade(Trade),
    ConnectionStatusChanged(ConnectionStatus),
    /// A fault; see [`FeedAlert::is_actionable`] for what to show the user.
    Error(FeedAlert),
}

/// An explicit list of subscribers.
///
/// Each subscriber gets its own channel, so registering one never replaces
/// another. Subscribers whose receiver was dropped are pruned on the next
/// emit.
#[derive(Debug, Default)]
pub struct Subscribers {
    senders: Vec<mpsc::UnboundedSender<FeedEvent>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<FeedEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    /// Delivers `event` to every live subscriber.
    pub fn emit(&mut self, event: FeedEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

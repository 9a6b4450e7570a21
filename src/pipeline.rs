//! The ingestion pipeline: history load, periodic latest-candle refresh and
//! the live trade stream, folded into one task.
//!
//! The task is the only owner of the [`Series`], so every merge happens on
//! one logical thread of control regardless of whether the poller or the
//! stream produced the update. Consumers only ever see published snapshots.

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, OptionFuture};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::config::AppConfig;
use crate::error::{ErrorKind, FeedAlert};
use crate::events::{FeedEvent, Subscribers};
use crate::fetcher::CandleFetcher;
use crate::models::Candle;
use crate::series::Series;
use crate::websocket::{StreamClient, StreamEvent};

/// Commands sent from the handle to the pipeline task.
enum PipelineCommand {
    /// Start a fresh stream session (after exhaustion, typically).
    Reconnect,
    Shutdown,
}

/// Result of one HTTP request, applied to the series on the pipeline task.
enum Fetched {
    History(Vec<Candle>),
    Latest(Option<Candle>),
}

/// A configured, not yet running pipeline.
pub struct Pipeline {
    config: AppConfig,
    fetcher: CandleFetcher,
    series: Series,
    subscribers: Subscribers,
}

impl Pipeline {
    /// Builds a pipeline from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`](crate::FeedError::Config) if the
    /// configuration is inconsistent, or
    /// [`FeedError::Http`](crate::FeedError::Http) if the HTTP client cannot
    /// be built.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = CandleFetcher::new(&config.http)?;
        let series = Series::new(config.series.max_candles);

        Ok(Self {
            config,
            fetcher,
            series,
            subscribers: Subscribers::new(),
        })
    }

    /// Registers a consumer. Call before [`spawn`](Self::spawn).
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<FeedEvent> {
        self.subscribers.subscribe()
    }

    /// Starts the pipeline on the current tokio runtime.
    pub fn spawn(self) -> PipelineHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(cmd_rx));
        PipelineHandle { cmd_tx, task }
    }

    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<PipelineCommand>) {
        let (stream_tx, mut stream_rx) = mpsc::unbounded_channel();
        let mut stream = StreamClient::new(self.config.stream.clone(), stream_tx);
        stream.start();

        // At most one HTTP request is in flight. Dropping it cancels it.
        let mut in_flight: Option<BoxFuture<'static, Fetched>> = Some(self.fetch_history());

        let period = self.config.series.poll_interval;
        let mut poll = tokio::time::interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(fetched) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                    in_flight = None;
                    self.on_fetched(fetched);
                }
                _ = poll.tick() => {
                    if in_flight.is_some() {
                        debug!("Previous fetch still in flight, skipping poll");
                    } else {
                        in_flight = Some(self.fetch_latest());
                    }
                }
                Some(event) = stream_rx.recv() => self.on_stream_event(event),
                cmd = cmd_rx.recv() => match cmd {
                    Some(PipelineCommand::Reconnect) => stream.restart().await,
                    Some(PipelineCommand::Shutdown) | None => break,
                },
            }
        }

        if in_flight.take().is_some() {
            debug!("Cancelled in-flight fetch");
        }
        stream.disconnect().await;
        while let Ok(event) = stream_rx.try_recv() {
            self.on_stream_event(event);
        }
        info!("Pipeline stopped");
    }

    fn fetch_history(&self) -> BoxFuture<'static, Fetched> {
        let fetcher = self.fetcher.clone();
        async move { Fetched::History(fetcher.fetch_history().await) }.boxed()
    }

    fn fetch_latest(&self) -> BoxFuture<'static, Fetched> {
        let fetcher = self.fetcher.clone();
        async move { Fetched::Latest(fetcher.fetch_latest().await) }.boxed()
    }

    fn on_fetched(&mut self, fetched: Fetched) {
        match fetched {
            Fetched::History(candles) => {
                self.series = Series::from_candles(candles, self.config.series.max_candles);
                info!(candles = self.series.len(), "History loaded");
                self.subscribers
                    .emit(FeedEvent::HistoryLoaded(self.series.clone()));
            }
            Fetched::Latest(None) => debug!("No new candle from latest-candle endpoint"),
            Fetched::Latest(Some(candle)) => {
                self.series.merge(candle);
                debug!(
                    timestamp = candle.timestamp,
                    candles = self.series.len(),
                    "Merged latest candle"
                );
                self.subscribers
                    .emit(FeedEvent::CandleUpdated(self.series.clone()));
            }
        }
    }

    fn on_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Status(status) => {
                self.subscribers
                    .emit(FeedEvent::ConnectionStatusChanged(status));
            }
            StreamEvent::Trade(trade) => {
                debug!(price = trade.price, time = trade.trade_time, "Trade received");
                self.subscribers.emit(FeedEvent::Trade(trade));
            }
            StreamEvent::Error(e) => {
                let alert = FeedAlert::from(&e);
                if alert.kind == ErrorKind::Exhausted {
                    error!("Trade stream gave up: {e}");
                } else {
                    warn!("Trade stream fault: {e}");
                }
                self.subscribers.emit(FeedEvent::Error(alert));
            }
        }
    }
}

/// Control handle for a running pipeline.
pub struct PipelineHandle {
    cmd_tx: mpsc::UnboundedSender<PipelineCommand>,
    task: JoinHandle<()>,
}

impl PipelineHandle {
    /// Starts a fresh stream session with a reset attempt counter.
    ///
    /// This is the caller intervention expected after an exhaustion alert.
    pub fn reconnect(&self) {
        if self.cmd_tx.send(PipelineCommand::Reconnect).is_err() {
            warn!("Reconnect requested but the pipeline has stopped");
        }
    }

    /// Stops polling, disconnects the stream and waits for the task to end.
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(PipelineCommand::Shutdown);
        if let Err(e) = self.task.await {
            error!("Pipeline task failed: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

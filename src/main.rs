use candlefeed::config::fetch_config;
use candlefeed::{FeedError, FeedEvent, Pipeline};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), FeedError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let app_config = fetch_config()?;
    info!(
        base_url = %app_config.http.base_url,
        websocket_url = %app_config.stream.websocket_url,
        "Starting candle feed"
    );

    let mut pipeline = Pipeline::new(app_config)?;
    let mut events = pipeline.subscribe();
    let handle = pipeline.spawn();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

fn log_event(event: &FeedEvent) {
    match event {
        FeedEvent::HistoryLoaded(series) => {
            info!(candles = series.len(), latest = ?series.latest(), "History loaded");
        }
        FeedEvent::CandleUpdated(series) => {
            info!(candles = series.len(), latest = ?series.latest(), "Candle updated");
        }
        FeedEvent::Trade(trade) => {
            info!(
                time = trade.trade_time,
                price = trade.price,
                amount_in = trade.amount_in,
                amount_out = trade.amount_out,
                "Trade"
            );
        }
        FeedEvent::ConnectionStatusChanged(status) => {
            info!(status = status.as_str(), "Connection status");
        }
        FeedEvent::Error(alert) if alert.is_actionable() => {
            error!("{alert}; restart to try again");
        }
        FeedEvent::Error(alert) => warn!("{alert}"),
    }
}

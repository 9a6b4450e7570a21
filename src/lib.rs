//! Market data ingestion client for a single trading pair.
//!
//! Decodes the compact binary candle and trade records served over HTTP
//! and WebSocket, keeps the trade stream alive with bounded exponential
//! backoff, and maintains an ordered, deduplicated, bounded candle series
//! for display.

pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod models;
pub mod pipeline;
pub mod series;
pub mod websocket;

pub use error::{ErrorKind, FeedAlert, FeedError, Result};
pub use events::FeedEvent;
pub use models::{Candle, ConnectionStatus, Trade};
pub use pipeline::{Pipeline, PipelineHandle};
pub use series::Series;

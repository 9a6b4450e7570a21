//! Application configuration loaded from environment variables.
//!
//! Every setting has a default; any of them can be overridden:
//! - `CANDLEFEED_API_BASE_URL` — base URL of the candle endpoints
//! - `CANDLEFEED_WEBSOCKET_URL` — trade stream endpoint
//! - `CANDLEFEED_HTTP_TIMEOUT_MS`, `CANDLEFEED_CONNECT_TIMEOUT_MS`
//! - `CANDLEFEED_MAX_CANDLES`, `CANDLEFEED_POLL_INTERVAL_MS`
//! - `CANDLEFEED_CONNECT_DELAY_MS`, `CANDLEFEED_RECONNECT_FLOOR_MS`,
//!   `CANDLEFEED_RECONNECT_CEILING_MS`, `CANDLEFEED_MAX_RECONNECT_ATTEMPTS`

use std::str::FromStr;
use std::time::Duration;

use crate::series::DEFAULT_MAX_CANDLES;

/// Default base URL for the candle endpoints.
const DEFAULT_BASE_URL: &str = "https://crypto-pump.bigtutu.workers.dev";

/// Default trade stream endpoint.
const DEFAULT_WEBSOCKET_URL: &str = "wss://crypto-pump.bigtutu.workers.dev/ws";

/// Path of the bulk history endpoint.
pub const HISTORY_PATH: &str = "/candle-chart";

/// Path of the single-latest-candle endpoint.
pub const LATEST_PATH: &str = "/single-candle";

/// Top-level application configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub stream: StreamConfig,
    pub series: SeriesConfig,
}

/// Settings for the history and latest-candle requests.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    pub history_path: String,
    pub latest_path: String,
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            history_path: HISTORY_PATH.to_string(),
            latest_path: LATEST_PATH.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Settings for the trade stream connection.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub websocket_url: String,
    /// How long a connect attempt may take before it is abandoned.
    pub connect_timeout: Duration,
    /// Delay between `start()` and the first connect attempt.
    pub connect_delay: Duration,
    /// First reconnect delay; doubled after every failed attempt.
    pub reconnect_floor: Duration,
    /// Upper bound for the reconnect delay.
    pub reconnect_ceiling: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            connect_delay: Duration::from_secs(1),
            reconnect_floor: Duration::from_secs(1),
            reconnect_ceiling: Duration::from_secs(30),
            max_reconnect_attempts: 5,
        }
    }
}

/// Settings for the in-memory series and its refresh loop.
#[derive(Debug, Clone)]
pub struct SeriesConfig {
    pub max_candles: usize,
    /// Interval between latest-candle fetches.
    pub poll_interval: Duration,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            max_candles: DEFAULT_MAX_CANDLES,
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// Loads the application configuration from environment variables.
///
/// Unset or empty variables fall back to their defaults.
///
/// # Errors
///
/// Returns [`FeedError::Config`](crate::FeedError::Config) if a numeric
/// variable cannot be parsed, `CANDLEFEED_MAX_CANDLES` is zero, or the
/// reconnect floor exceeds the ceiling.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Some(url) = non_empty_var("CANDLEFEED_API_BASE_URL") {
        config.http.base_url = url;
    }
    if let Some(url) = non_empty_var("CANDLEFEED_WEBSOCKET_URL") {
        config.stream.websocket_url = url;
    }
    if let Some(timeout) = millis_var("CANDLEFEED_HTTP_TIMEOUT_MS")? {
        config.http.timeout = timeout;
    }
    if let Some(timeout) = millis_var("CANDLEFEED_CONNECT_TIMEOUT_MS")? {
        config.stream.connect_timeout = timeout;
    }
    if let Some(delay) = millis_var("CANDLEFEED_CONNECT_DELAY_MS")? {
        config.stream.connect_delay = delay;
    }
    if let Some(floor) = millis_var("CANDLEFEED_RECONNECT_FLOOR_MS")? {
        config.stream.reconnect_floor = floor;
    }
    if let Some(ceiling) = millis_var("CANDLEFEED_RECONNECT_CEILING_MS")? {
        config.stream.reconnect_ceiling = ceiling;
    }
    if let Some(attempts) = parsed_var("CANDLEFEED_MAX_RECONNECT_ATTEMPTS")? {
        config.stream.max_reconnect_attempts = attempts;
    }
    if let Some(max) = parsed_var("CANDLEFEED_MAX_CANDLES")? {
        config.series.max_candles = max;
    }
    if let Some(interval) = millis_var("CANDLEFEED_POLL_INTERVAL_MS")? {
        config.series.poll_interval = interval;
    }

    config.validate()?;
    Ok(config)
}

impl AppConfig {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`](crate::FeedError::Config) describing the
    /// first violated constraint.
    pub fn validate(&self) -> crate::Result<()> {
        if self.series.max_candles == 0 {
            return Err(crate::FeedError::Config(
                "CANDLEFEED_MAX_CANDLES must be at least 1".to_string(),
            ));
        }
        if self.series.poll_interval.is_zero() {
            return Err(crate::FeedError::Config(
                "CANDLEFEED_POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        if self.stream.reconnect_floor > self.stream.reconnect_ceiling {
            return Err(crate::FeedError::Config(format!(
                "reconnect floor {:?} exceeds ceiling {:?}",
                self.stream.reconnect_floor, self.stream.reconnect_ceiling
            )));
        }
        Ok(())
    }
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parsed_var<T: FromStr>(name: &str) -> crate::Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    non_empty_var(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                crate::FeedError::Config(format!("{name}={raw:?} is not valid: {e}"))
            })
        })
        .transpose()
}

fn millis_var(name: &str) -> crate::Result<Option<Duration>> {
    Ok(parsed_var::<u64>(name)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Serializes tests that touch the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 10] = [
        "CANDLEFEED_API_BASE_URL",
        "CANDLEFEED_WEBSOCKET_URL",
        "CANDLEFEED_HTTP_TIMEOUT_MS",
        "CANDLEFEED_CONNECT_TIMEOUT_MS",
        "CANDLEFEED_CONNECT_DELAY_MS",
        "CANDLEFEED_RECONNECT_FLOOR_MS",
        "CANDLEFEED_RECONNECT_CEILING_MS",
        "CANDLEFEED_MAX_RECONNECT_ATTEMPTS",
        "CANDLEFEED_MAX_CANDLES",
        "CANDLEFEED_POLL_INTERVAL_MS",
    ];

    /// Helper that clears every feed variable, applies `vars`, runs `f`,
    /// then restores the originals.
    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let originals: Vec<(&str, Option<String>)> = ALL_VARS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        // SAFETY: every test touching these variables holds ENV_LOCK.
        unsafe {
            for k in ALL_VARS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        for (k, original) in originals {
            // SAFETY: restoring original values under the same lock.
            unsafe {
                match original {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    fn defaults_without_env_vars() {
        with_env(&[], || {
            let config = fetch_config().unwrap();
            assert_eq!(config.http.base_url, DEFAULT_BASE_URL);
            assert_eq!(config.http.history_path, "/candle-chart");
            assert_eq!(config.http.latest_path, "/single-candle");
            assert_eq!(config.http.timeout, Duration::from_secs(10));
            assert_eq!(config.stream.websocket_url, DEFAULT_WEBSOCKET_URL);
            assert_eq!(config.stream.connect_timeout, Duration::from_secs(5));
            assert_eq!(config.stream.reconnect_floor, Duration::from_secs(1));
            assert_eq!(config.stream.reconnect_ceiling, Duration::from_secs(30));
            assert_eq!(config.stream.max_reconnect_attempts, 5);
            assert_eq!(config.series.max_candles, 1000);
            assert_eq!(config.series.poll_interval, Duration::from_secs(60));
        });
    }

    #[test]
    fn overrides_from_env() {
        with_env(
            &[
                ("CANDLEFEED_API_BASE_URL", "http://127.0.0.1:8080"),
                ("CANDLEFEED_WEBSOCKET_URL", "ws://127.0.0.1:8080/ws"),
                ("CANDLEFEED_MAX_CANDLES", "250"),
                ("CANDLEFEED_POLL_INTERVAL_MS", "15000"),
                ("CANDLEFEED_MAX_RECONNECT_ATTEMPTS", "8"),
            ],
            || {
                let config = fetch_config().unwrap();
                assert_eq!(config.http.base_url, "http://127.0.0.1:8080");
                assert_eq!(config.stream.websocket_url, "ws://127.0.0.1:8080/ws");
                assert_eq!(config.series.max_candles, 250);
                assert_eq!(config.series.poll_interval, Duration::from_secs(15));
                assert_eq!(config.stream.max_reconnect_attempts, 8);
            },
        );
    }

    #[test]
    fn empty_values_treated_as_absent() {
        with_env(
            &[
                ("CANDLEFEED_API_BASE_URL", ""),
                ("CANDLEFEED_MAX_CANDLES", ""),
            ],
            || {
                let config = fetch_config().unwrap();
                assert_eq!(config.http.base_url, DEFAULT_BASE_URL);
                assert_eq!(config.series.max_candles, DEFAULT_MAX_CANDLES);
            },
        );
    }

    #[test]
    fn rejects_unparseable_number() {
        with_env(&[("CANDLEFEED_HTTP_TIMEOUT_MS", "soon")], || {
            let err = fetch_config().unwrap_err();
            assert!(err.to_string().contains("CANDLEFEED_HTTP_TIMEOUT_MS"));
        });
    }

    #[test]
    fn rejects_zero_max_candles() {
        with_env(&[("CANDLEFEED_MAX_CANDLES", "0")], || {
            let err = fetch_config().unwrap_err();
            assert!(err.to_string().contains("at least 1"));
        });
    }

    #[test]
    fn rejects_floor_above_ceiling() {
        with_env(
            &[
                ("CANDLEFEED_RECONNECT_FLOOR_MS", "60000"),
                ("CANDLEFEED_RECONNECT_CEILING_MS", "30000"),
            ],
            || {
                let err = fetch_config().unwrap_err();
                assert!(err.to_string().contains("exceeds ceiling"));
            },
        );
    }
}

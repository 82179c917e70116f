//! Agent configuration loaded from environment variables.

use std::time::Duration;

use evdealer_backend::ApiConfig;
use evdealer_core::availability::StockKey;
use evdealer_stock::listener::DEFAULT_QUEUE_CAPACITY;
use evdealer_stock::reconnect::ReconnectConfig;
use evdealer_stock::ListenerConfig;

/// Runtime configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// REST base URL, e.g. `http://host:3000`.
    pub backend_api_url: String,
    /// Stock push endpoint, e.g. `ws://host:3000/ws/stock`.
    pub stock_ws_url: String,
    pub request_timeout: Duration,
    pub queue_capacity: usize,
    pub reconnect: ReconnectConfig,
    /// Keys whose advisory figures are warmed and logged on change.
    pub watch_keys: Vec<StockKey>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl AgentConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default |
    /// |------------------------|---------|
    /// | `BACKEND_API_URL`      | --      |
    /// | `STOCK_WS_URL`         | --      |
    /// | `REQUEST_TIMEOUT_SECS` | `30`    |
    /// | `STOCK_QUEUE_CAPACITY` | `256`   |
    /// | `RECONNECT_INITIAL_MS` | `1000`  |
    /// | `RECONNECT_MAX_SECS`   | `30`    |
    /// | `WATCH_KEYS`           | empty   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns the raw value of
    /// a variable if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let backend_api_url = required("BACKEND_API_URL")?;
        let stock_ws_url = required("STOCK_WS_URL")?;
        if !(stock_ws_url.starts_with("ws://") || stock_ws_url.starts_with("wss://")) {
            return Err(ConfigError::Invalid {
                name: "STOCK_WS_URL",
                reason: "must start with ws:// or wss://".into(),
            });
        }

        let request_timeout_secs: u64 = parse_or(var("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 30)?;
        let queue_capacity: usize = parse_or(
            var("STOCK_QUEUE_CAPACITY"),
            "STOCK_QUEUE_CAPACITY",
            DEFAULT_QUEUE_CAPACITY,
        )?;
        if queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "STOCK_QUEUE_CAPACITY",
                reason: "must be at least 1".into(),
            });
        }

        let defaults = ReconnectConfig::default();
        let initial_ms: u64 = parse_or(
            var("RECONNECT_INITIAL_MS"),
            "RECONNECT_INITIAL_MS",
            defaults.initial_delay.as_millis() as u64,
        )?;
        let max_secs: u64 = parse_or(
            var("RECONNECT_MAX_SECS"),
            "RECONNECT_MAX_SECS",
            defaults.max_delay.as_secs(),
        )?;
        let reconnect = ReconnectConfig {
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_secs(max_secs).max(Duration::from_millis(initial_ms)),
            ..defaults
        };

        let watch_keys = match var("WATCH_KEYS") {
            Some(raw) => parse_watch_keys(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            backend_api_url,
            stock_ws_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            queue_capacity,
            reconnect,
            watch_keys,
        })
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.backend_api_url.clone(),
            request_timeout: self.request_timeout,
        }
    }

    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            reconnect: self.reconnect.clone(),
            queue_capacity: self.queue_capacity,
        }
    }
}

/// Parse comma-separated `version:color` pairs. Duplicates are dropped.
pub fn parse_watch_keys(raw: &str) -> Result<Vec<StockKey>, ConfigError> {
    let mut keys = Vec::new();
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let invalid = || ConfigError::Invalid {
            name: "WATCH_KEYS",
            reason: format!("expected version:color, got '{pair}'"),
        };
        let (version, color) = pair.split_once(':').ok_or_else(invalid)?;
        let key = StockKey::new(
            version.trim().parse().map_err(|_| invalid())?,
            color.trim().parse().map_err(|_| invalid())?,
        );
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    Ok(keys)
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("'{v}' is not a valid number"),
        }),
        None => Ok(default),
    }
}

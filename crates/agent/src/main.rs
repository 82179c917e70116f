//! `evdealer-agent` -- advisory stock monitor for the dealer console.
//!
//! Subscribes to the backend's stock push channel, keeps the configured
//! (version, color) keys warm in the shared availability store and logs
//! every change until Ctrl-C.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default | Description                              |
//! |------------------------|----------|---------|------------------------------------------|
//! | `BACKEND_API_URL`      | yes      | --      | REST base URL, e.g. `http://host:3000`   |
//! | `STOCK_WS_URL`         | yes      | --      | Push endpoint, e.g. `ws://host:3000/ws/stock` |
//! | `REQUEST_TIMEOUT_SECS` | no       | `30`    | Per-request REST timeout                 |
//! | `STOCK_QUEUE_CAPACITY` | no       | `256`   | Pending pushed updates                   |
//! | `RECONNECT_INITIAL_MS` | no       | `1000`  | First reconnect delay                    |
//! | `RECONNECT_MAX_SECS`   | no       | `30`    | Reconnect delay cap                      |
//! | `WATCH_KEYS`           | no       | --      | `version:color` pairs, comma separated   |

use evdealer_agent::config::AgentConfig;
use evdealer_agent::monitor;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evdealer_agent=info,evdealer_stock=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        backend_api_url = %config.backend_api_url,
        stock_ws_url = %config.stock_ws_url,
        watch_keys = config.watch_keys.len(),
        "Starting evdealer-agent",
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    if let Err(e) = monitor::run(&config, shutdown).await {
        tracing::error!(error = %e, "Monitor failed");
        std::process::exit(1);
    }

    tracing::info!("evdealer-agent stopped");
}

//! Exponential-backoff reconnection for the stock push channel.
//!
//! When the connection drops, the listener calls [`reconnect_loop`] to keep
//! retrying with increasing delays until either the connection is restored
//! or the [`CancellationToken`] is triggered. Losing the channel is never
//! fatal: the cache simply goes staler until delivery resumes.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::client::{StockConnection, StockFeedClient};
use crate::events::ListenerState;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Reconnect to the push endpoint with exponential backoff.
///
/// Waits `initial_delay` before the first attempt. Publishes
/// `Connecting` before each attempt and `Disconnected` after each failure.
/// Returns `Some(connection)` once a connection succeeds, or `None` if
/// `cancel` is triggered first.
pub async fn reconnect_loop(
    client: &StockFeedClient,
    config: &ReconnectConfig,
    state: &watch::Sender<ListenerState>,
    cancel: &CancellationToken,
) -> Option<StockConnection> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        // Wait before the attempt, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
        tracing::info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting to stock feed",
        );
        state.send_replace(ListenerState::Connecting);

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            result = client.connect() => {
                match result {
                    Ok(conn) => {
                        tracing::info!(attempt, "Reconnected to stock feed");
                        return Some(conn);
                    }
                    Err(e) => {
                        state.send_replace(ListenerState::Disconnected);
                        tracing::warn!(
                            error = %e,
                            "Reconnect attempt {attempt} failed",
                        );
                    }
                }
            }
        }

        delay = next_delay(delay, config);
    }
}

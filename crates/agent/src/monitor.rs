//! Advisory stock monitor.
//!
//! Starts the stock listener, warms the configured keys through the
//! read-through availability service, keeps them watched, and logs every
//! change until shutdown is requested.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use evdealer_backend::{BackendError, DealerApi, DealerBackend};
use evdealer_core::availability::{AvailabilityEntry, StockKey};
use evdealer_pipeline::AvailabilityService;
use evdealer_stock::client::StockFeedClient;
use evdealer_stock::{AvailabilityStore, StockListener};

use crate::config::AgentConfig;

/// Run the monitor until `shutdown` resolves.
pub async fn run(config: &AgentConfig, shutdown: impl Future<Output = ()>) -> Result<(), BackendError> {
    let backend: Arc<dyn DealerBackend> = Arc::new(DealerApi::new(&config.api_config())?);
    let store = Arc::new(AvailabilityStore::default());

    let listener = StockListener::start(
        StockFeedClient::new(config.stock_ws_url.clone()),
        Arc::clone(&store),
        config.listener_config(),
    );

    let availability = AvailabilityService::new(backend, Arc::clone(&store));
    let _watching: Vec<_> = config.watch_keys.iter().map(|key| store.watch(*key)).collect();
    let mut changes = store.subscribe();
    let mut state = listener.state();

    warm(&availability, &config.watch_keys).await;

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                tracing::info!(state = ?current, "Stock feed state changed");
            }
            change = changes.recv() => match change {
                Ok(change) => {
                    tracing::info!(
                        key = %change.entry.key,
                        quantity = change.entry.quantity,
                        updated = %change.entry.last_updated,
                        source = ?change.source,
                        "Advisory availability changed",
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Change log fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    listener.stop().await;
    Ok(())
}

/// Resolve each key once, logging failures. Returns the entries that
/// resolved.
pub async fn warm(availability: &AvailabilityService, keys: &[StockKey]) -> Vec<AvailabilityEntry> {
    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        match availability.get(*key).await {
            Ok(entry) => {
                tracing::info!(
                    key = %key,
                    quantity = entry.quantity,
                    updated = %entry.last_updated,
                    "Advisory availability",
                );
                entries.push(entry);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to resolve availability");
            }
        }
    }
    entries
}

//! Read-through access to advisory stock figures.
//!
//! Cached entries are served as-is. An unknown key is fetched from the
//! backend and written through the shared [`AvailabilityStore`], where the
//! same last-write-wins rule applies as for pushed updates.

use std::sync::Arc;

use evdealer_backend::{BackendError, DealerBackend};
use evdealer_core::availability::{AvailabilityEntry, PutOutcome, StockKey};
use evdealer_stock::{AvailabilityStore, UpdateSource};

#[derive(Clone)]
pub struct AvailabilityService {
    backend: Arc<dyn DealerBackend>,
    store: Arc<AvailabilityStore>,
}

impl AvailabilityService {
    pub fn new(backend: Arc<dyn DealerBackend>, store: Arc<AvailabilityStore>) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &Arc<AvailabilityStore> {
        &self.store
    }

    /// Cached entry for `key`, fetching it on first use.
    pub async fn get(&self, key: StockKey) -> Result<AvailabilityEntry, BackendError> {
        if let Some(entry) = self.store.get(&key).await {
            return Ok(entry);
        }
        self.refresh(key).await
    }

    /// Query the backend for `key` and write the answer through the store.
    ///
    /// When a newer figure arrived (by push) while the query was in flight,
    /// the newer cached entry is returned instead of the query's answer.
    pub async fn refresh(&self, key: StockKey) -> Result<AvailabilityEntry, BackendError> {
        let level = self.backend.get_stock(key).await?;

        let outcome = self
            .store
            .put(key, level.quantity, level.updated_at, UpdateSource::Query)
            .await;

        let fetched = AvailabilityEntry {
            key,
            quantity: level.quantity,
            last_updated: level.updated_at,
        };

        match outcome {
            PutOutcome::Stale { .. } => Ok(self.store.get(&key).await.unwrap_or(fetched)),
            _ => {
                tracing::debug!(key = %key, quantity = level.quantity, "Fetched stock level");
                Ok(fetched)
            }
        }
    }
}

impl std::fmt::Debug for AvailabilityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

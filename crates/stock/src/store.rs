//! Shared advisory availability store.
//!
//! [`AvailabilityStore`] wraps the last-write-wins
//! [`AvailabilityCache`] for concurrent use by the push listener and the
//! selection workflows. Every applied update lands in the cache; a
//! [`AvailabilityChange`] is broadcast only for keys someone is currently
//! displaying (see [`AvailabilityStore::watch`]).
//!
//! The store is advisory. Nothing read from it gates a submission.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, RwLock};

use evdealer_core::availability::{AvailabilityCache, AvailabilityEntry, PutOutcome, StockKey};
use evdealer_core::types::Timestamp;

use crate::events::{AvailabilityChange, UpdateSource};

/// Default buffer capacity for the change broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// Concurrent last-write-wins stock cache with displayed-key notifications.
///
/// Designed to be shared via `Arc<AvailabilityStore>`.
pub struct AvailabilityStore {
    cache: RwLock<AvailabilityCache>,
    /// Displayed keys with their watcher counts. A plain mutex because
    /// [`WatchGuard`] releases it from `Drop`.
    watched: Mutex<HashMap<StockKey, usize>>,
    sender: broadcast::Sender<AvailabilityChange>,
}

impl AvailabilityStore {
    /// Create a store with a specific change-channel capacity.
    ///
    /// Slow subscribers observe `RecvError::Lagged` when the buffer fills;
    /// the cache itself is never affected.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            cache: RwLock::new(AvailabilityCache::new()),
            watched: Mutex::new(HashMap::new()),
            sender,
        }
    }

    /// Last known entry for `key`, or `None` if never resolved.
    pub async fn get(&self, key: &StockKey) -> Option<AvailabilityEntry> {
        self.cache.read().await.get(key).copied()
    }

    /// Last known entry for `key` without waiting on a writer.
    ///
    /// Returns `None` while a write is in progress. Callers that need the
    /// outcome of that write watch the key first, so it reaches them as a
    /// broadcast instead.
    pub fn peek(&self, key: &StockKey) -> Option<AvailabilityEntry> {
        self.cache.try_read().ok()?.get(key).copied()
    }

    /// Apply an authoritative quantity. Stale updates are discarded.
    ///
    /// The broadcast is sent before the write lock is released, so changes
    /// for one key reach subscribers in timestamp order.
    pub async fn put(
        &self,
        key: StockKey,
        quantity: u32,
        timestamp: Timestamp,
        source: UpdateSource,
    ) -> PutOutcome {
        let mut cache = self.cache.write().await;
        let outcome = cache.put(key, quantity, timestamp);

        match outcome {
            PutOutcome::Stale { cached_at } => {
                tracing::debug!(
                    key = %key,
                    quantity,
                    %timestamp,
                    %cached_at,
                    ?source,
                    "Discarded out-of-order stock update",
                );
            }
            _ => {
                if self.is_watched(&key) {
                    let entry = AvailabilityEntry {
                        key,
                        quantity,
                        last_updated: timestamp,
                    };
                    // Ignore the SendError: it only means there are zero receivers.
                    let _ = self.sender.send(AvailabilityChange { entry, source });
                }
            }
        }

        drop(cache);
        outcome
    }

    /// Mark `key` as displayed until the returned guard is dropped.
    pub fn watch(self: &Arc<Self>, key: StockKey) -> WatchGuard {
        *self.lock_watched().entry(key).or_insert(0) += 1;
        WatchGuard {
            store: Arc::clone(self),
            key,
        }
    }

    pub fn is_watched(&self, key: &StockKey) -> bool {
        self.lock_watched().contains_key(key)
    }

    /// Subscribe to changes of displayed keys.
    pub fn subscribe(&self) -> broadcast::Receiver<AvailabilityChange> {
        self.sender.subscribe()
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    fn unwatch(&self, key: &StockKey) {
        let mut watched = self.lock_watched();
        if let Some(count) = watched.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                watched.remove(key);
            }
        }
    }

    fn lock_watched(&self) -> std::sync::MutexGuard<'_, HashMap<StockKey, usize>> {
        // The map holds plain counters, so a poisoned lock is still consistent.
        self.watched.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for AvailabilityStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Keeps a key marked as displayed; unwatches on drop.
#[derive(Debug)]
pub struct WatchGuard {
    store: Arc<AvailabilityStore>,
    key: StockKey,
}

impl WatchGuard {
    pub fn key(&self) -> StockKey {
        self.key
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.store.unwatch(&self.key);
    }
}

impl std::fmt::Debug for AvailabilityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityStore").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tokio::sync::broadcast::error::TryRecvError;

    #[tokio::test]
    async fn put_then_get() {
        let store = AvailabilityStore::default();
        let key = StockKey::new(1, 10);
        let now = Utc::now();

        assert!(store.get(&key).await.is_none());
        store.put(key, 3, now, UpdateSource::Query).await;

        let entry = store.get(&key).await.unwrap();
        assert_eq!(entry.quantity, 3);
        assert_eq!(entry.last_updated, now);
    }

    #[tokio::test]
    async fn older_push_does_not_overwrite() {
        let store = AvailabilityStore::default();
        let key = StockKey::new(1, 10);
        let now = Utc::now();

        store.put(key, 3, now, UpdateSource::Push).await;
        let outcome = store
            .put(key, 0, now - Duration::seconds(5), UpdateSource::Push)
            .await;

        assert!(!outcome.is_applied());
        assert_eq!(store.get(&key).await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn only_watched_keys_are_broadcast() {
        let store = Arc::new(AvailabilityStore::default());
        let mut rx = store.subscribe();
        let shown = StockKey::new(1, 10);
        let hidden = StockKey::new(1, 11);
        let _guard = store.watch(shown);

        store.put(hidden, 5, Utc::now(), UpdateSource::Push).await;
        store.put(shown, 2, Utc::now(), UpdateSource::Push).await;

        let change = rx.try_recv().unwrap();
        assert_eq!(change.entry.key, shown);
        assert_eq!(change.entry.quantity, 2);
        assert_eq!(change.source, UpdateSource::Push);
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);

        // The hidden key is still cached for later reads.
        assert_eq!(store.get(&hidden).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn stale_update_is_not_broadcast() {
        let store = Arc::new(AvailabilityStore::default());
        let key = StockKey::new(1, 10);
        let now = Utc::now();
        let _guard = store.watch(key);
        store.put(key, 3, now, UpdateSource::Push).await;

        let mut rx = store.subscribe();
        store
            .put(key, 0, now - Duration::seconds(1), UpdateSource::Push)
            .await;
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn dropping_last_guard_unwatches() {
        let store = Arc::new(AvailabilityStore::default());
        let key = StockKey::new(2, 20);

        let first = store.watch(key);
        let second = store.watch(key);
        assert_eq!(first.key(), key);
        drop(first);
        assert!(store.is_watched(&key));
        drop(second);
        assert!(!store.is_watched(&key));
    }

    #[tokio::test]
    async fn peek_reads_without_waiting() {
        let store = AvailabilityStore::default();
        let key = StockKey::new(3, 30);
        let now = Utc::now();

        assert!(store.peek(&key).is_none());
        store.put(key, 7, now, UpdateSource::Query).await;
        assert_eq!(store.peek(&key).unwrap().quantity, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_broadcast_in_timestamp_order() {
        let store = Arc::new(AvailabilityStore::new(1024));
        let key = StockKey::new(4, 40);
        let _guard = store.watch(key);
        let mut rx = store.subscribe();
        let base = Utc::now();

        let writers: Vec<_> = (0..64i64)
            .map(|i| {
                let store = Arc::clone(&store);
                // Interleave early and late timestamps across tasks.
                let offset = if i % 2 == 0 { i } else { 64 - i };
                let source = if i % 3 == 0 {
                    UpdateSource::Query
                } else {
                    UpdateSource::Push
                };
                tokio::spawn(async move {
                    store
                        .put(key, i as u32, base + Duration::seconds(offset), source)
                        .await;
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let mut last = None;
        let mut received = 0;
        while let Ok(change) = rx.try_recv() {
            if let Some(previous) = last {
                assert!(change.entry.last_updated >= previous);
            }
            last = Some(change.entry.last_updated);
            received += 1;
        }
        assert!(received > 0);
        assert_eq!(
            store.get(&key).await.unwrap().last_updated,
            last.unwrap()
        );
    }
}

//! Advisory stock cache keyed by (version, color).
//!
//! Quantities only ever come from the authoritative source (a query or a
//! push event). Writes are last-write-wins by timestamp; an update older
//! than what is cached is discarded so out-of-order delivery cannot roll a
//! value back. Equal timestamps are applied (latest arrival wins).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Cache key: one sellable (version, color) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub version_id: DbId,
    pub color_id: DbId,
}

impl StockKey {
    pub fn new(version_id: DbId, color_id: DbId) -> Self {
        Self {
            version_id,
            color_id,
        }
    }
}

impl std::fmt::Display for StockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.version_id, self.color_id)
    }
}

/// Last known on-hand quantity for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub key: StockKey,
    pub quantity: u32,
    pub last_updated: Timestamp,
}

/// What a [`AvailabilityCache::put`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// First value for this key.
    Inserted,
    /// An existing entry was replaced wholesale.
    Replaced { previous: u32 },
    /// The update was older than the cached entry and was discarded.
    Stale { cached_at: Timestamp },
}

impl PutOutcome {
    /// Whether the cache now holds the value that was put.
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Stale { .. })
    }
}

/// In-memory last-write-wins map of [`AvailabilityEntry`] values.
#[derive(Debug, Default)]
pub struct AvailabilityCache {
    entries: HashMap<StockKey, AvailabilityEntry>,
}

impl AvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known entry, or `None` when the key has never been resolved.
    pub fn get(&self, key: &StockKey) -> Option<&AvailabilityEntry> {
        self.entries.get(key)
    }

    /// Store `quantity` for `key` unless a newer value is already cached.
    pub fn put(&mut self, key: StockKey, quantity: u32, timestamp: Timestamp) -> PutOutcome {
        let entry = AvailabilityEntry {
            key,
            quantity,
            last_updated: timestamp,
        };

        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(key, entry);
                PutOutcome::Inserted
            }
            Some(current) if timestamp < current.last_updated => PutOutcome::Stale {
                cached_at: current.last_updated,
            },
            Some(current) => {
                let previous = current.quantity;
                *current = entry;
                PutOutcome::Replaced { previous }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

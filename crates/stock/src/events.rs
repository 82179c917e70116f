//! Observable state of the push channel and store change notifications.

use serde::Serialize;

use evdealer_core::availability::AvailabilityEntry;

/// Connection lifecycle of the [`StockListener`](crate::listener::StockListener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Connected,
}

/// Where a cached quantity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSource {
    /// Pushed by the backend over the stock channel.
    Push,
    /// Pulled by an explicit stock query.
    Query,
}

/// A change to a displayed key, broadcast by the
/// [`AvailabilityStore`](crate::store::AvailabilityStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailabilityChange {
    pub entry: AvailabilityEntry,
    pub source: UpdateSource,
}

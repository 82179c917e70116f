//! Stock-change push channel and the shared advisory availability store.
//!
//! Provides typed message parsing, WebSocket connection handling,
//! reconnection with exponential backoff, and a supervised
//! [`StockListener`](listener::StockListener) that feeds push events
//! through a bounded queue into the
//! [`AvailabilityStore`](store::AvailabilityStore).

pub mod client;
pub mod events;
pub mod listener;
pub mod messages;
pub mod processor;
pub mod reconnect;
pub mod store;

pub use events::{AvailabilityChange, ListenerState, UpdateSource};
pub use listener::{ListenerConfig, StockListener};
pub use store::{AvailabilityStore, WatchGuard};

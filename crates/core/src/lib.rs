//! Domain logic for the dealer console booking and VIN ingestion pipelines.
//!
//! Everything in this crate is pure: no network, no clock reads outside of
//! explicit arguments, no shared state. The async crates (`evdealer-stock`,
//! `evdealer-pipeline`) drive these types against the backend.

pub mod availability;
pub mod booking;
pub mod catalog;
pub mod error;
pub mod selection;
pub mod types;
pub mod units;
pub mod vin;

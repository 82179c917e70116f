//! REST client for the dealer backend.
//!
//! [`DealerBackend`] is the seam the pipelines are written against;
//! [`DealerApi`] implements it over HTTP with [`reqwest`]. Successful
//! responses are wrapped as `{"data": ...}`.

pub mod api;
pub mod backend;
pub mod error;

pub use api::{ApiConfig, DealerApi};
pub use backend::{DealerBackend, StockLevel};
pub use error::BackendError;

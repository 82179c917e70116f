//! Booking and VIN ingestion workflows.
//!
//! Ties the pure domain logic in `evdealer-core` to the backend REST client
//! and the shared availability store:
//!
//! - [`CatalogResolver`] resolves templates and template-backed color lists.
//! - [`AvailabilityService`] reads through the store to the backend.
//! - [`SelectionController`] and [`SelectionWorkflow`] drive one line item's
//!   cascading selection and drop stale responses.
//! - [`BookingService`] submits a booking.
//! - [`VinBatchService`] runs the pre-submission existence check and
//!   creates units all-or-nothing.

pub mod availability;
pub mod booking;
pub mod catalog;
pub mod error;
pub mod selection;
pub mod vin_batch;

pub use availability::AvailabilityService;
pub use booking::BookingService;
pub use catalog::CatalogResolver;
pub use error::PipelineError;
pub use selection::{Applied, LookupResult, SelectionController, SelectionWorkflow};
pub use vin_batch::VinBatchService;

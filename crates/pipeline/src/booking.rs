//! Booking submission.

use std::sync::Arc;

use evdealer_backend::DealerBackend;
use evdealer_core::booking::{build_booking_request, BookingId, LineItemDraft};

use crate::error::PipelineError;

/// Submits bookings to the backend. Never retries.
#[derive(Clone)]
pub struct BookingService {
    backend: Arc<dyn DealerBackend>,
}

impl BookingService {
    pub fn new(backend: Arc<dyn DealerBackend>) -> Self {
        Self { backend }
    }

    /// Validate every line item locally, then issue one create call.
    ///
    /// Local validation failures make no network call. Backend rejections
    /// are returned verbatim; check
    /// [`PipelineError::may_have_committed`] before offering a resubmit.
    pub async fn submit(
        &self,
        note: &str,
        drafts: &[LineItemDraft],
    ) -> Result<BookingId, PipelineError> {
        let request = build_booking_request(note, drafts)?;
        let line_items = request.line_items.len();

        match self.backend.create_booking(&request).await {
            Ok(booking_id) => {
                tracing::info!(booking_id = %booking_id, line_items, "Booking created");
                Ok(booking_id)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    line_items,
                    may_have_committed = e.may_have_committed(),
                    "Booking submission failed",
                );
                Err(e.into())
            }
        }
    }
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService").finish_non_exhaustive()
    }
}

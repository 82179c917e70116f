//! The backend operations the pipelines depend on.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use evdealer_core::availability::StockKey;
use evdealer_core::booking::{BookingId, CreateBookingRequest};
use evdealer_core::catalog::{CarModel, Color, TemplateLookup, Version};
use evdealer_core::types::{DbId, Timestamp};
use evdealer_core::units::CreateUnitsRequest;

use crate::error::BackendError;

/// Authoritative on-hand quantity for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub version_id: DbId,
    pub color_id: DbId,
    pub quantity: u32,
    /// When the backend last changed this figure. Stamped at receipt when
    /// the backend omits it.
    #[serde(default = "Utc::now")]
    pub updated_at: Timestamp,
}

impl StockLevel {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.version_id, self.color_id)
    }
}

/// Backend REST surface consumed by the booking and VIN pipelines.
///
/// Request/response calls are never retried by implementations; callers
/// decide what to surface.
#[async_trait]
pub trait DealerBackend: Send + Sync {
    async fn list_models(&self) -> Result<Vec<CarModel>, BackendError>;

    async fn list_versions(&self, model_id: DbId) -> Result<Vec<Version>, BackendError>;

    /// Candidate colors for a version. The backend may or may not filter by
    /// template existence; callers must not rely on it.
    async fn list_colors(&self, version_id: DbId) -> Result<Vec<Color>, BackendError>;

    /// Template for a (version, color) pair. A missing combination is
    /// `Ok(TemplateLookup::NotFound)`, not an error.
    async fn get_template(
        &self,
        version_id: DbId,
        color_id: DbId,
    ) -> Result<TemplateLookup, BackendError>;

    async fn get_stock(&self, key: StockKey) -> Result<StockLevel, BackendError>;

    async fn create_booking(
        &self,
        request: &CreateBookingRequest,
    ) -> Result<BookingId, BackendError>;

    /// The subset of `vins` already present in the store.
    async fn find_existing_vins(&self, vins: &[String]) -> Result<Vec<String>, BackendError>;

    /// Create one unit per VIN in a single all-or-nothing call. Returns the
    /// number of units the backend reports as created.
    async fn create_units(&self, request: &CreateUnitsRequest) -> Result<u64, BackendError>;
}

//! Shared fixtures: an in-memory [`DealerBackend`] seeded with a small
//! catalog.
//!
//! Catalog: model A (1) with versions V1 (11) and V2 (12). Colors Red (101)
//! and Blue (102) are listed for V1, Red and White (103) for V2. Only
//! (V1, Red) has a template, so V2 offers no colors at all.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use evdealer_backend::{BackendError, DealerBackend, StockLevel};
use evdealer_core::availability::StockKey;
use evdealer_core::booking::{BookingId, CreateBookingRequest};
use evdealer_core::catalog::{CarModel, Color, Template, TemplateLookup, Version};
use evdealer_core::types::DbId;
use evdealer_core::units::CreateUnitsRequest;
use evdealer_stock::AvailabilityStore;

pub const MODEL_A: DbId = 1;
pub const V1: DbId = 11;
pub const V2: DbId = 12;
pub const RED: DbId = 101;
pub const BLUE: DbId = 102;
pub const WHITE: DbId = 103;
pub const RED_V1_TEMPLATE: DbId = 501;

#[derive(Debug, Default)]
pub struct FakeState {
    pub models: Vec<CarModel>,
    pub versions: HashMap<DbId, Vec<Version>>,
    pub colors: HashMap<DbId, Vec<Color>>,
    pub templates: HashMap<(DbId, DbId), Template>,
    pub stock: HashMap<StockKey, StockLevel>,
    pub existing_vins: HashSet<String>,
    /// Color whose template lookup answers 500.
    pub failing_template_color: Option<DbId>,
    /// Rejection returned by the next create-booking call.
    pub booking_rejection: Option<(u16, String)>,
    /// Count reported by create-units instead of the request size.
    pub created_override: Option<u64>,
    pub booking_requests: Vec<CreateBookingRequest>,
    pub unit_requests: Vec<CreateUnitsRequest>,
    pub existence_queries: Vec<Vec<String>>,
    pub stock_queries: usize,
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    /// The catalog described in the module docs, with (V1, Red) = 3 on hand.
    pub fn seeded() -> Arc<Self> {
        let backend = Self::default();
        {
            let mut s = backend.state();
            s.models.push(CarModel {
                id: MODEL_A,
                name: "Model A".into(),
            });
            s.versions.insert(
                MODEL_A,
                vec![version(V1, "Standard Range"), version(V2, "Long Range")],
            );
            s.colors
                .insert(V1, vec![color(RED, "Red"), color(BLUE, "Blue")]);
            s.colors
                .insert(V2, vec![color(RED, "Red"), color(WHITE, "White")]);
            s.templates.insert(
                (V1, RED),
                Template {
                    id: RED_V1_TEMPLATE,
                    version_id: V1,
                    color_id: RED,
                    price: 4_500_000,
                    attributes: serde_json::json!({"range_km": 420}),
                },
            );
            s.stock.insert(
                StockKey::new(V1, RED),
                StockLevel {
                    version_id: V1,
                    color_id: RED,
                    quantity: 3,
                    updated_at: at(0),
                },
            );
        }
        Arc::new(backend)
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl DealerBackend for FakeBackend {
    async fn list_models(&self) -> Result<Vec<CarModel>, BackendError> {
        Ok(self.state().models.clone())
    }

    async fn list_versions(&self, model_id: DbId) -> Result<Vec<Version>, BackendError> {
        Ok(self
            .state()
            .versions
            .get(&model_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_colors(&self, version_id: DbId) -> Result<Vec<Color>, BackendError> {
        Ok(self
            .state()
            .colors
            .get(&version_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_template(
        &self,
        version_id: DbId,
        color_id: DbId,
    ) -> Result<TemplateLookup, BackendError> {
        let s = self.state();
        if s.failing_template_color == Some(color_id) {
            return Err(BackendError::Api {
                status: 500,
                body: "template lookup failed".into(),
            });
        }
        Ok(match s.templates.get(&(version_id, color_id)) {
            Some(template) => TemplateLookup::Found(template.clone()),
            None => TemplateLookup::NotFound,
        })
    }

    async fn get_stock(&self, key: StockKey) -> Result<StockLevel, BackendError> {
        let mut s = self.state();
        s.stock_queries += 1;
        s.stock.get(&key).copied().ok_or_else(|| BackendError::Api {
            status: 404,
            body: format!("no stock record for {key}"),
        })
    }

    async fn create_booking(
        &self,
        request: &CreateBookingRequest,
    ) -> Result<BookingId, BackendError> {
        let mut s = self.state();
        s.booking_requests.push(request.clone());
        if let Some((status, body)) = s.booking_rejection.take() {
            return Err(BackendError::Api { status, body });
        }
        Ok(BookingId(format!("BK-{}", s.booking_requests.len())))
    }

    async fn find_existing_vins(&self, vins: &[String]) -> Result<Vec<String>, BackendError> {
        let mut s = self.state();
        s.existence_queries.push(vins.to_vec());
        // Answer in lowercase to exercise normalization of the reply.
        Ok(vins
            .iter()
            .filter(|v| s.existing_vins.contains(*v))
            .map(|v| v.to_lowercase())
            .collect())
    }

    async fn create_units(&self, request: &CreateUnitsRequest) -> Result<u64, BackendError> {
        let mut s = self.state();
        s.unit_requests.push(request.clone());
        let created = s
            .created_override
            .unwrap_or(request.vin_list.len() as u64);
        for vin in &request.vin_list {
            s.existing_vins.insert(vin.clone());
        }
        Ok(created)
    }
}

pub fn store() -> Arc<AvailabilityStore> {
    Arc::new(AvailabilityStore::default())
}

/// Seconds after a fixed base instant.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

pub fn version(id: DbId, name: &str) -> Version {
    Version {
        id,
        model_id: MODEL_A,
        name: name.into(),
    }
}

pub fn color(id: DbId, name: &str) -> Color {
    Color {
        id,
        name: name.into(),
        hex_code: None,
    }
}

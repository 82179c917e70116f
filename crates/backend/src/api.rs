//! HTTP implementation of [`DealerBackend`].
//!
//! Wraps the backend REST API (catalog lookups, stock queries, booking
//! creation, VIN existence checks and unit creation) using [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use evdealer_core::availability::StockKey;
use evdealer_core::booking::{BookingId, CreateBookingRequest};
use evdealer_core::catalog::{CarModel, Color, Template, TemplateLookup, Version};
use evdealer_core::types::DbId;
use evdealer_core::units::CreateUnitsRequest;

use crate::backend::{DealerBackend, StockLevel};
use crate::error::BackendError;

/// Connection settings for the backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, e.g. `http://host:3000`.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the dealer backend.
pub struct DealerApi {
    client: reqwest::Client,
    base_url: String,
}

/// Standard success envelope.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ExistingVins {
    existing: Vec<String>,
}

impl DealerApi {
    /// Build a client with the configured timeout.
    pub fn new(config: &ApiConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`BackendError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse the `data` field of a successful response.
    ///
    /// A 2xx body that does not match the expected shape is a
    /// [`BackendError::MalformedSuccess`], never a silent default.
    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice::<DataEnvelope<T>>(&bytes)
            .map(|envelope| envelope.data)
            .map_err(|e| BackendError::MalformedSuccess(e.to_string()))
    }
}

#[async_trait]
impl DealerBackend for DealerApi {
    async fn list_models(&self) -> Result<Vec<CarModel>, BackendError> {
        let response = self.client.get(self.url("/models")).send().await?;
        Self::parse_data(response).await
    }

    async fn list_versions(&self, model_id: DbId) -> Result<Vec<Version>, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/models/{model_id}/versions")))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    async fn list_colors(&self, version_id: DbId) -> Result<Vec<Color>, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/versions/{version_id}/colors")))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    async fn get_template(
        &self,
        version_id: DbId,
        color_id: DbId,
    ) -> Result<TemplateLookup, BackendError> {
        let response = self
            .client
            .get(self.url("/templates"))
            .query(&[("version_id", version_id), ("color_id", color_id)])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(version_id, color_id, "No template for combination");
            return Ok(TemplateLookup::NotFound);
        }

        let template: Template = Self::parse_data(response).await?;
        Ok(TemplateLookup::Found(template))
    }

    async fn get_stock(&self, key: StockKey) -> Result<StockLevel, BackendError> {
        let response = self
            .client
            .get(self.url("/stock"))
            .query(&[("version_id", key.version_id), ("color_id", key.color_id)])
            .send()
            .await?;
        let level: StockLevel = Self::parse_data(response).await?;

        if level.key() != key {
            return Err(BackendError::MalformedSuccess(format!(
                "Stock requested for {key} but response is for {}",
                level.key()
            )));
        }
        Ok(level)
    }

    async fn create_booking(
        &self,
        request: &CreateBookingRequest,
    ) -> Result<BookingId, BackendError> {
        let response = self
            .client
            .post(self.url("/bookings"))
            .json(request)
            .send()
            .await?;

        let data: serde_json::Value = Self::parse_data(response).await?;
        let booking_id = extract_booking_id(&data)?;

        tracing::info!(
            booking_id = %booking_id,
            line_items = request.line_items.len(),
            "Booking created",
        );
        Ok(booking_id)
    }

    async fn find_existing_vins(&self, vins: &[String]) -> Result<Vec<String>, BackendError> {
        if vins.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(self.url("/vehicles/existing"))
            .query(&[("vins", vins.join(","))])
            .send()
            .await?;
        let existing: ExistingVins = Self::parse_data(response).await?;
        Ok(existing.existing)
    }

    async fn create_units(&self, request: &CreateUnitsRequest) -> Result<u64, BackendError> {
        let response = self
            .client
            .post(self.url("/vehicles"))
            .json(request)
            .send()
            .await?;

        let data: serde_json::Value = Self::parse_data(response).await?;
        let created = data
            .get("created")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| {
                BackendError::MalformedSuccess("create units response has no 'created' count".into())
            })?;

        tracing::info!(
            template_id = request.template_id,
            warehouse_id = request.warehouse_id,
            created,
            "Units created",
        );
        Ok(created)
    }
}

/// Pull `booking_id` out of a create-booking `data` object. Numeric ids
/// are accepted and converted to strings.
fn extract_booking_id(data: &serde_json::Value) -> Result<BookingId, BackendError> {
    match data.get("booking_id") {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(BookingId(s.clone())),
        Some(serde_json::Value::Number(n)) => Ok(BookingId(n.to_string())),
        _ => Err(BackendError::MalformedSuccess(
            "create booking response has no 'booking_id'".into(),
        )),
    }
}

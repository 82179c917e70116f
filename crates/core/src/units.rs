//! Physical-unit provisioning requests.
//!
//! A VIN batch is created against one catalog template and one warehouse in
//! a single all-or-nothing backend call.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Status assigned to newly created units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    InStock,
    InTransit,
    Reserved,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "in_stock",
            Self::InTransit => "in_transit",
            Self::Reserved => "reserved",
        }
    }
}

/// Where and how a batch of units is provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitProvisioning {
    pub template_id: DbId,
    pub warehouse_id: DbId,
    pub status: UnitStatus,
    pub manufacture_date: NaiveDate,
    pub import_date: NaiveDate,
    pub warranty_expiry_date: NaiveDate,
}

impl UnitProvisioning {
    /// Dates must be ordered: manufactured, then imported, then warranty
    /// expiry strictly after import.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.import_date < self.manufacture_date {
            return Err(CoreError::Validation(format!(
                "Import date {} is before manufacture date {}",
                self.import_date, self.manufacture_date
            )));
        }
        if self.warranty_expiry_date <= self.import_date {
            return Err(CoreError::Validation(format!(
                "Warranty expiry {} must be after import date {}",
                self.warranty_expiry_date, self.import_date
            )));
        }
        Ok(())
    }

    /// Assemble the create-units body for `vins`.
    pub fn to_request(&self, vins: Vec<String>) -> CreateUnitsRequest {
        CreateUnitsRequest {
            template_id: self.template_id,
            warehouse_id: self.warehouse_id,
            vin_list: vins,
            status: self.status,
            manufacture_date: self.manufacture_date,
            import_date: self.import_date,
            warranty_expiry_date: self.warranty_expiry_date,
        }
    }
}

/// Body of the create-units call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateUnitsRequest {
    pub template_id: DbId,
    pub warehouse_id: DbId,
    pub vin_list: Vec<String>,
    pub status: UnitStatus,
    pub manufacture_date: NaiveDate,
    pub import_date: NaiveDate,
    pub warranty_expiry_date: NaiveDate,
}

//! VIN batch submission.
//!
//! Local checks run as identifiers are entered (see
//! [`VinBatch::ingest`]). Right before the create call the surviving set is
//! re-checked against the store; any hit blocks the whole batch. Units are
//! then created in a single all-or-nothing call. A commit racing the check
//! is caught by the backend's own uniqueness constraint and surfaces as
//! the backend's conflict response.

use std::collections::HashSet;
use std::sync::Arc;

use evdealer_backend::DealerBackend;
use evdealer_core::error::CoreError;
use evdealer_core::vin::{IntakeReport, StoreCheck, VinBatch, VinRule, VinValidationState};

use crate::error::PipelineError;

#[derive(Clone)]
pub struct VinBatchService {
    backend: Arc<dyn DealerBackend>,
    rule: VinRule,
}

impl VinBatchService {
    pub fn new(backend: Arc<dyn DealerBackend>, rule: VinRule) -> Self {
        Self { backend, rule }
    }

    pub fn rule(&self) -> &VinRule {
        &self.rule
    }

    /// Parse free-form input into `batch`.
    pub fn ingest(&self, batch: &mut VinBatch, input: &str) -> Result<IntakeReport, CoreError> {
        batch.ingest(&self.rule, input)
    }

    /// Add one operator-entered identifier to `batch`.
    pub fn ingest_one(
        &self,
        batch: &mut VinBatch,
        raw: &str,
    ) -> Result<VinValidationState, CoreError> {
        batch.ingest_one(&self.rule, raw)
    }

    /// Query the store for every surviving candidate and mark hits as
    /// `DuplicateInStore`, the rest as `Accepted`.
    pub async fn check_store(&self, batch: &mut VinBatch) -> Result<StoreCheck, PipelineError> {
        let vins = batch.surviving_vins();
        let existing: HashSet<String> = if vins.is_empty() {
            HashSet::new()
        } else {
            self.backend
                .find_existing_vins(&vins)
                .await?
                .iter()
                .map(|vin| self.rule.normalize(vin))
                .collect()
        };

        let check = batch.apply_store_check(&existing);
        tracing::debug!(
            checked = vins.len(),
            accepted = check.accepted,
            duplicates = check.duplicates.len(),
            "VIN existence check",
        );
        Ok(check)
    }

    /// Re-check and submit the batch, returning the number of units
    /// created. The batch is reset on success and left intact otherwise.
    pub async fn submit(&self, batch: &mut VinBatch) -> Result<u64, PipelineError> {
        let target = batch.target().cloned().ok_or_else(|| {
            CoreError::Validation("Choose a template and warehouse before submitting".into())
        })?;
        target.validate()?;

        let blocked: Vec<String> = batch
            .store_duplicates()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !blocked.is_empty() {
            return Err(PipelineError::BatchBlocked {
                duplicates: blocked,
            });
        }

        if batch.surviving().next().is_none() {
            return Err(CoreError::Validation("The batch has no identifiers".into()).into());
        }

        let check = self.check_store(batch).await?;
        if !check.is_clear() {
            tracing::warn!(
                duplicates = ?check.duplicates,
                "VIN batch blocked by existing identifiers",
            );
            return Err(PipelineError::BatchBlocked {
                duplicates: check.duplicates,
            });
        }

        let vins = batch.accepted_vins()?;
        let expected = vins.len();
        let request = target.to_request(vins);

        let created = self.backend.create_units(&request).await.map_err(|e| {
            tracing::warn!(
                error = %e,
                expected,
                may_have_committed = e.may_have_committed(),
                "Unit creation failed",
            );
            e
        })?;

        if created != expected as u64 {
            tracing::error!(expected, created, "Unit count mismatch after creation");
            return Err(PipelineError::UnitCountMismatch { expected, created });
        }

        tracing::info!(
            created,
            template_id = target.template_id,
            warehouse_id = target.warehouse_id,
            "Units created",
        );
        batch.reset();
        Ok(created)
    }
}

impl std::fmt::Debug for VinBatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VinBatchService")
            .field("rule", &self.rule)
            .finish_non_exhaustive()
    }
}

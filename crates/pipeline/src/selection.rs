//! Per-line-item selection driving.
//!
//! [`SelectionController`] owns one line item's [`SelectionState`] plus the
//! lists currently offered to the operator. Transitions are synchronous and
//! hand back a [`Lookup`]; results are fed back with [`SelectionController::apply`],
//! which drops them as [`Applied::Stale`] when the selection has moved on.
//! [`SelectionWorkflow`] performs the lookups against the backend.

use std::sync::Arc;

use evdealer_backend::DealerBackend;
use evdealer_core::availability::{AvailabilityEntry, StockKey};
use evdealer_core::booking::{BookingLineItem, LineItemDraft};
use evdealer_core::catalog::{ColorOption, Version};
use evdealer_core::error::CoreError;
use evdealer_core::selection::{Lookup, SelectionState};
use evdealer_core::types::DbId;
use evdealer_stock::{AvailabilityChange, AvailabilityStore, WatchGuard};

use crate::availability::AvailabilityService;
use crate::catalog::CatalogResolver;
use crate::error::PipelineError;

/// Data answering a [`Lookup`].
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    Versions(Vec<Version>),
    Colors(Vec<ColorOption>),
    Availability(AvailabilityEntry),
}

/// Whether a lookup result changed the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// The selection moved on since the lookup was issued.
    Stale,
}

/// Selection state and offered choices for one booking line item.
#[derive(Debug)]
pub struct SelectionController {
    state: SelectionState,
    versions: Vec<Version>,
    colors: Vec<ColorOption>,
    store: Arc<AvailabilityStore>,
    /// Keeps the advisory key watched while it is displayed.
    advisory_watch: Option<WatchGuard>,
}

impl SelectionController {
    pub fn new(store: Arc<AvailabilityStore>) -> Self {
        Self {
            state: SelectionState::default(),
            versions: Vec::new(),
            colors: Vec::new(),
            store,
            advisory_watch: None,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Versions offered for the current model.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Colors offered for the current version. Each has a template.
    pub fn colors(&self) -> &[ColorOption] {
        &self.colors
    }

    pub fn advisory(&self) -> Option<&AvailabilityEntry> {
        self.state.advisory()
    }

    pub fn choose_model(&mut self, model_id: DbId) -> Lookup {
        self.versions.clear();
        self.colors.clear();
        self.advisory_watch = None;
        self.state.choose_model(model_id)
    }

    pub fn clear_model(&mut self) {
        self.versions.clear();
        self.colors.clear();
        self.advisory_watch = None;
        self.state.clear_model();
    }

    /// Choose one of the offered versions.
    pub fn choose_version(&mut self, version_id: DbId) -> Result<Lookup, CoreError> {
        let version = self
            .versions
            .iter()
            .find(|v| v.id == version_id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "Version",
                id: version_id,
            })?;

        let lookup = self.state.choose_version(&version)?;
        self.colors.clear();
        self.advisory_watch = None;
        Ok(lookup)
    }

    pub fn clear_version(&mut self) {
        self.colors.clear();
        self.advisory_watch = None;
        self.state.clear_version();
    }

    /// Choose one of the offered colors.
    pub fn choose_color(&mut self, color_id: DbId) -> Result<Lookup, CoreError> {
        let option = self
            .colors
            .iter()
            .find(|o| o.color.id == color_id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "Color",
                id: color_id,
            })?;

        let lookup = self.state.choose_color(&option)?;
        // Watch before the lookup runs so pushes landing in the meantime
        // are broadcast.
        match lookup {
            Lookup::Availability { key, .. } => self.watch_advisory(key),
            _ => self.advisory_watch = None,
        }
        Ok(lookup)
    }

    pub fn clear_color(&mut self) {
        self.advisory_watch = None;
        self.state.clear_color();
    }

    /// Apply the answer to `lookup`, unless the selection has moved on.
    pub fn apply(&mut self, lookup: Lookup, result: LookupResult) -> Result<Applied, CoreError> {
        if !lookup.is_current(&self.state) {
            tracing::debug!(?lookup, "Discarded stale lookup result");
            return Ok(Applied::Stale);
        }

        match (lookup, result) {
            (Lookup::Versions { model_id }, LookupResult::Versions(mut versions)) => {
                versions.retain(|v| v.model_id == model_id);
                self.versions = versions;
            }
            (Lookup::Colors { version_id, .. }, LookupResult::Colors(mut colors)) => {
                colors.retain(|o| o.template.version_id == version_id);
                self.colors = colors;
            }
            (Lookup::Availability { key, .. }, LookupResult::Availability(entry)) => {
                self.watch_advisory(key);
                // A push may have landed after the lookup read the store.
                let entry = match self.store.peek(&key) {
                    Some(cached) if cached.last_updated > entry.last_updated => cached,
                    _ => entry,
                };
                self.state.record_availability(entry)?;
            }
            (lookup, result) => {
                return Err(CoreError::Internal(format!(
                    "Result {result:?} does not answer {lookup:?}"
                )));
            }
        }

        Ok(Applied::Applied)
    }

    /// Fold a pushed change into the displayed advisory.
    ///
    /// Returns `true` if the displayed quantity was replaced. Changes for
    /// other keys, or older than the displayed figure, are ignored.
    pub fn on_stock_change(&mut self, change: &AvailabilityChange) -> bool {
        let Some(current) = self.state.advisory() else {
            return false;
        };
        if current.key != change.entry.key || change.entry.last_updated < current.last_updated {
            return false;
        }
        self.state.record_availability(change.entry).is_ok()
    }

    fn watch_advisory(&mut self, key: StockKey) {
        if self.advisory_watch.as_ref().map(WatchGuard::key) != Some(key) {
            self.advisory_watch = Some(self.store.watch(key));
        }
    }

    /// The current selection as a draft line item.
    pub fn draft(&self, quantity: u32) -> LineItemDraft {
        LineItemDraft::new(self.state.clone(), quantity)
    }

    pub fn to_line_item(&self, quantity: u32) -> Result<BookingLineItem, CoreError> {
        self.draft(quantity).to_line_item()
    }
}

/// Performs selection lookups against the backend.
#[derive(Debug, Clone)]
pub struct SelectionWorkflow {
    catalog: CatalogResolver,
    availability: AvailabilityService,
}

impl SelectionWorkflow {
    pub fn new(backend: Arc<dyn DealerBackend>, store: Arc<AvailabilityStore>) -> Self {
        Self {
            catalog: CatalogResolver::new(Arc::clone(&backend)),
            availability: AvailabilityService::new(backend, store),
        }
    }

    /// A fresh controller sharing this workflow's store.
    pub fn controller(&self) -> SelectionController {
        SelectionController::new(Arc::clone(self.availability.store()))
    }

    pub fn catalog(&self) -> &CatalogResolver {
        &self.catalog
    }

    /// Fetch the data answering `lookup`. Availability is always queried
    /// fresh, not served from the cache.
    pub async fn resolve(&self, lookup: Lookup) -> Result<LookupResult, PipelineError> {
        let result = match lookup {
            Lookup::Versions { model_id } => {
                LookupResult::Versions(self.catalog.list_versions(model_id).await?)
            }
            Lookup::Colors { version_id, .. } => {
                LookupResult::Colors(self.catalog.selectable_colors(version_id).await?)
            }
            Lookup::Availability { key, .. } => {
                LookupResult::Availability(self.availability.refresh(key).await?)
            }
        };
        Ok(result)
    }

    pub async fn choose_model(
        &self,
        controller: &mut SelectionController,
        model_id: DbId,
    ) -> Result<Applied, PipelineError> {
        let lookup = controller.choose_model(model_id);
        self.complete(controller, lookup).await
    }

    pub async fn choose_version(
        &self,
        controller: &mut SelectionController,
        version_id: DbId,
    ) -> Result<Applied, PipelineError> {
        let lookup = controller.choose_version(version_id)?;
        self.complete(controller, lookup).await
    }

    /// Choose a color and fetch its advisory quantity.
    ///
    /// The color stays chosen even if the availability query fails; the
    /// advisory never blocks booking.
    pub async fn choose_color(
        &self,
        controller: &mut SelectionController,
        color_id: DbId,
    ) -> Result<Applied, PipelineError> {
        let lookup = controller.choose_color(color_id)?;
        self.complete(controller, lookup).await
    }

    async fn complete(
        &self,
        controller: &mut SelectionController,
        lookup: Lookup,
    ) -> Result<Applied, PipelineError> {
        let result = self.resolve(lookup).await?;
        Ok(controller.apply(lookup, result)?)
    }
}

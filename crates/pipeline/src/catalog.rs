//! Template resolution and template-backed color lists.

use std::sync::Arc;

use futures::future::try_join_all;

use evdealer_backend::{BackendError, DealerBackend};
use evdealer_core::catalog::{self, CarModel, ColorOption, TemplateLookup, Version};
use evdealer_core::types::DbId;

/// Resolves catalog lookups against the backend.
#[derive(Clone)]
pub struct CatalogResolver {
    backend: Arc<dyn DealerBackend>,
}

impl CatalogResolver {
    pub fn new(backend: Arc<dyn DealerBackend>) -> Self {
        Self { backend }
    }

    pub async fn list_models(&self) -> Result<Vec<CarModel>, BackendError> {
        self.backend.list_models().await
    }

    /// Versions of `model_id`. Records the backend attributes to another
    /// model are dropped.
    pub async fn list_versions(&self, model_id: DbId) -> Result<Vec<Version>, BackendError> {
        let mut versions = self.backend.list_versions(model_id).await?;
        versions.retain(|v| v.model_id == model_id);
        Ok(versions)
    }

    /// Template for (version, color). `NotFound` means the combination is
    /// not sold; transport and backend failures stay errors.
    pub async fn resolve_template(
        &self,
        version_id: DbId,
        color_id: DbId,
    ) -> Result<TemplateLookup, BackendError> {
        self.backend.get_template(version_id, color_id).await
    }

    /// Colors of `version_id` that resolve to a template.
    ///
    /// Every candidate is resolved concurrently. If any lookup fails the
    /// whole listing fails; a partial list is never returned.
    pub async fn selectable_colors(&self, version_id: DbId) -> Result<Vec<ColorOption>, BackendError> {
        let candidates = self.backend.list_colors(version_id).await?;

        let lookups = try_join_all(
            candidates
                .iter()
                .map(|color| self.resolve_template(version_id, color.id)),
        )
        .await?;

        let options = catalog::selectable_colors(version_id, candidates.into_iter().zip(lookups));

        tracing::debug!(
            version_id,
            selectable = options.len(),
            "Resolved selectable colors",
        );

        Ok(options)
    }
}

impl std::fmt::Debug for CatalogResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogResolver").finish_non_exhaustive()
    }
}

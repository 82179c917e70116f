//! Catalog records and template resolution outcomes.
//!
//! A [`Template`] is the sellable combination of a version and a color.
//! Many version/color pairs were never catalogued; that is an expected
//! outcome ([`TemplateLookup::NotFound`]), not a failure.

use serde::{Deserialize, Serialize};

use crate::availability::StockKey;
use crate::types::DbId;

/// A vehicle model (top of the selection cascade).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarModel {
    pub id: DbId,
    pub name: String,
}

/// A version (trim) of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: DbId,
    pub model_id: DbId,
    pub name: String,
}

/// An exterior color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub hex_code: Option<String>,
}

/// A sellable version + color combination with its price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: DbId,
    pub version_id: DbId,
    pub color_id: DbId,
    /// Price in minor currency units.
    pub price: i64,
    /// Descriptive attributes (range, battery, seats, ...), passed through as-is.
    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl Template {
    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.version_id, self.color_id)
    }
}

/// Result of resolving a (version, color) pair against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateLookup {
    Found(Template),
    /// No sellable combination exists for the pair.
    NotFound,
}

impl TemplateLookup {
    pub fn template(&self) -> Option<&Template> {
        match self {
            Self::Found(t) => Some(t),
            Self::NotFound => None,
        }
    }

    pub fn into_template(self) -> Option<Template> {
        match self {
            Self::Found(t) => Some(t),
            Self::NotFound => None,
        }
    }
}

/// A color that is selectable for a version because a template backs it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorOption {
    pub color: Color,
    pub template: Template,
}

impl ColorOption {
    pub fn stock_key(&self) -> StockKey {
        self.template.stock_key()
    }
}

/// Pair candidate colors with their lookups, keeping only those that
/// resolved to a template for `version_id`.
///
/// Candidate order is preserved. A lookup that returned a template for a
/// different version or color is discarded rather than trusted.
pub fn selectable_colors(
    version_id: DbId,
    resolved: impl IntoIterator<Item = (Color, TemplateLookup)>,
) -> Vec<ColorOption> {
    resolved
        .into_iter()
        .filter_map(|(color, lookup)| {
            let template = lookup.into_template()?;
            if template.version_id != version_id || template.color_id != color.id {
                return None;
            }
            Some(ColorOption { color, template })
        })
        .collect()
}

//! Cascading model → version → color selection for one booking line item.
//!
//! The state is a tagged enum, so a version cannot exist without a model and
//! a color cannot exist without a version. Every transition validates before
//! it mutates: a rejected transition leaves the state untouched.
//!
//! Transitions that need server data hand back a [`Lookup`] naming the
//! query parameters. When the response arrives, [`Lookup::is_current`]
//! decides whether it still matches the selection; late answers to stale
//! queries are dropped instead of overwriting newer state.

use serde::Serialize;

use crate::availability::{AvailabilityEntry, StockKey};
use crate::catalog::{ColorOption, Version};
use crate::error::CoreError;
use crate::types::DbId;

/// Selection progress for one line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SelectionState {
    #[default]
    NoModel,
    ModelChosen {
        model_id: DbId,
    },
    VersionChosen {
        model_id: DbId,
        version_id: DbId,
    },
    ColorChosen {
        model_id: DbId,
        version_id: DbId,
        color_id: DbId,
        template_id: DbId,
    },
    /// Color chosen and an advisory quantity fetched for display.
    QuantityChecked {
        model_id: DbId,
        version_id: DbId,
        color_id: DbId,
        template_id: DbId,
        advisory: AvailabilityEntry,
    },
}

impl SelectionState {
    pub fn model_id(&self) -> Option<DbId> {
        match self {
            Self::NoModel => None,
            Self::ModelChosen { model_id }
            | Self::VersionChosen { model_id, .. }
            | Self::ColorChosen { model_id, .. }
            | Self::QuantityChecked { model_id, .. } => Some(*model_id),
        }
    }

    pub fn version_id(&self) -> Option<DbId> {
        match self {
            Self::NoModel | Self::ModelChosen { .. } => None,
            Self::VersionChosen { version_id, .. }
            | Self::ColorChosen { version_id, .. }
            | Self::QuantityChecked { version_id, .. } => Some(*version_id),
        }
    }

    pub fn color_id(&self) -> Option<DbId> {
        match self {
            Self::ColorChosen { color_id, .. } | Self::QuantityChecked { color_id, .. } => {
                Some(*color_id)
            }
            _ => None,
        }
    }

    pub fn template_id(&self) -> Option<DbId> {
        match self {
            Self::ColorChosen { template_id, .. } | Self::QuantityChecked { template_id, .. } => {
                Some(*template_id)
            }
            _ => None,
        }
    }

    /// The (version, color) key once a color is chosen.
    pub fn stock_key(&self) -> Option<StockKey> {
        Some(StockKey::new(self.version_id()?, self.color_id()?))
    }

    /// Advisory quantity, if one has been fetched for the current color.
    pub fn advisory(&self) -> Option<&AvailabilityEntry> {
        match self {
            Self::QuantityChecked { advisory, .. } => Some(advisory),
            _ => None,
        }
    }

    /// Model, version and color are all resolved.
    pub fn is_complete(&self) -> bool {
        self.color_id().is_some()
    }

    /// Select a model. Any version and color are cleared.
    pub fn choose_model(&mut self, model_id: DbId) -> Lookup {
        *self = Self::ModelChosen { model_id };
        Lookup::Versions { model_id }
    }

    pub fn clear_model(&mut self) {
        *self = Self::NoModel;
    }

    /// Select a version of the current model. Any color is cleared.
    pub fn choose_version(&mut self, version: &Version) -> Result<Lookup, CoreError> {
        let model_id = self
            .model_id()
            .ok_or_else(|| CoreError::Validation("Choose a model before a version".into()))?;

        if version.model_id != model_id {
            return Err(CoreError::Validation(format!(
                "Version {} does not belong to model {model_id}",
                version.id
            )));
        }

        *self = Self::VersionChosen {
            model_id,
            version_id: version.id,
        };
        Ok(Lookup::Colors {
            model_id,
            version_id: version.id,
        })
    }

    /// Drop back to `ModelChosen` (or stay at `NoModel`).
    pub fn clear_version(&mut self) {
        *self = match self.model_id() {
            Some(model_id) => Self::ModelChosen { model_id },
            None => Self::NoModel,
        };
    }

    /// Select a color that is backed by a template for the current version.
    pub fn choose_color(&mut self, option: &ColorOption) -> Result<Lookup, CoreError> {
        let (model_id, version_id) = match (self.model_id(), self.version_id()) {
            (Some(m), Some(v)) => (m, v),
            _ => {
                return Err(CoreError::Validation(
                    "Choose a version before a color".into(),
                ))
            }
        };

        if option.template.version_id != version_id || option.template.color_id != option.color.id
        {
            return Err(CoreError::Validation(format!(
                "Color {} has no template for version {version_id}",
                option.color.id
            )));
        }

        *self = Self::ColorChosen {
            model_id,
            version_id,
            color_id: option.color.id,
            template_id: option.template.id,
        };
        Ok(Lookup::Availability {
            model_id,
            key: StockKey::new(version_id, option.color.id),
        })
    }

    /// Drop back to `VersionChosen` (or the nearest earlier stage).
    pub fn clear_color(&mut self) {
        *self = match (self.model_id(), self.version_id()) {
            (Some(model_id), Some(version_id)) => Self::VersionChosen {
                model_id,
                version_id,
            },
            (Some(model_id), None) => Self::ModelChosen { model_id },
            _ => Self::NoModel,
        };
    }

    /// Attach an advisory quantity for the chosen color.
    ///
    /// Replaces any earlier advisory for the same key; an entry for another
    /// key is rejected.
    pub fn record_availability(&mut self, entry: AvailabilityEntry) -> Result<(), CoreError> {
        let current = match self {
            Self::ColorChosen {
                model_id,
                version_id,
                color_id,
                template_id,
            }
            | Self::QuantityChecked {
                model_id,
                version_id,
                color_id,
                template_id,
                ..
            } => (*model_id, *version_id, *color_id, *template_id),
            _ => {
                return Err(CoreError::Validation(
                    "No color chosen for availability".into(),
                ))
            }
        };
        let (model_id, version_id, color_id, template_id) = current;

        if entry.key != StockKey::new(version_id, color_id) {
            return Err(CoreError::Validation(format!(
                "Availability for {} does not match selection {version_id}:{color_id}",
                entry.key
            )));
        }

        *self = Self::QuantityChecked {
            model_id,
            version_id,
            color_id,
            template_id,
            advisory: entry,
        };
        Ok(())
    }
}

/// A pending query issued by a selection transition, keyed by its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Version list for a model.
    Versions { model_id: DbId },
    /// Selectable colors for a version.
    Colors { model_id: DbId, version_id: DbId },
    /// Advisory on-hand quantity for the chosen (version, color).
    Availability { model_id: DbId, key: StockKey },
}

impl Lookup {
    /// Whether a response to this lookup still applies to `state`.
    pub fn is_current(&self, state: &SelectionState) -> bool {
        match self {
            Self::Versions { model_id } => state.model_id() == Some(*model_id),
            Self::Colors {
                model_id,
                version_id,
            } => state.model_id() == Some(*model_id) && state.version_id() == Some(*version_id),
            Self::Availability { model_id, key } => {
                state.model_id() == Some(*model_id) && state.stock_key() == Some(*key)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Color, Template};
    use assert_matches::assert_matches;
    use chrono::Utc;
    use proptest::prelude::*;

    fn version(id: DbId, model_id: DbId) -> Version {
        Version {
            id,
            model_id,
            name: format!("V{id}"),
        }
    }

    fn option(version_id: DbId, color_id: DbId) -> ColorOption {
        ColorOption {
            color: Color {
                id: color_id,
                name: format!("C{color_id}"),
                hex_code: None,
            },
            template: Template {
                id: version_id * 100 + color_id,
                version_id,
                color_id,
                price: 1,
                attributes: serde_json::Value::Null,
            },
        }
    }

    fn entry(version_id: DbId, color_id: DbId, quantity: u32) -> AvailabilityEntry {
        AvailabilityEntry {
            key: StockKey::new(version_id, color_id),
            quantity,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn full_cascade_reaches_quantity_checked() {
        let mut state = SelectionState::default();
        assert_eq!(state.choose_model(1), Lookup::Versions { model_id: 1 });
        state.choose_version(&version(11, 1)).unwrap();
        state.choose_color(&option(11, 5)).unwrap();
        state.record_availability(entry(11, 5, 2)).unwrap();

        assert_eq!(state.stock_key(), Some(StockKey::new(11, 5)));
        assert_eq!(state.template_id(), Some(1105));
        assert_eq!(state.advisory().unwrap().quantity, 2);
        assert!(state.is_complete());
    }

    #[test]
    fn model_change_clears_version_and_color() {
        let mut state = SelectionState::default();
        state.choose_model(1);
        state.choose_version(&version(11, 1)).unwrap();
        state.choose_color(&option(11, 5)).unwrap();

        state.choose_model(2);
        assert_eq!(state, SelectionState::ModelChosen { model_id: 2 });
    }

    #[test]
    fn version_change_clears_color() {
        let mut state = SelectionState::default();
        state.choose_model(1);
        state.choose_version(&version(11, 1)).unwrap();
        state.choose_color(&option(11, 5)).unwrap();

        state.choose_version(&version(12, 1)).unwrap();
        assert_eq!(state.version_id(), Some(12));
        assert_eq!(state.color_id(), None);
    }

    #[test]
    fn version_of_other_model_is_rejected_without_change() {
        let mut state = SelectionState::default();
        state.choose_model(1);
        let err = state.choose_version(&version(21, 2)).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
        assert_eq!(state, SelectionState::ModelChosen { model_id: 1 });
    }

    #[test]
    fn color_requires_version() {
        let mut state = SelectionState::default();
        state.choose_model(1);
        assert!(state.choose_color(&option(11, 5)).is_err());
    }

    #[test]
    fn color_for_other_version_is_rejected() {
        let mut state = SelectionState::default();
        state.choose_model(1);
        state.choose_version(&version(11, 1)).unwrap();
        assert!(state.choose_color(&option(12, 5)).is_err());
        assert_eq!(state.color_id(), None);
    }

    #[test]
    fn availability_for_other_key_is_rejected() {
        let mut state = SelectionState::default();
        state.choose_model(1);
        state.choose_version(&version(11, 1)).unwrap();
        state.choose_color(&option(11, 5)).unwrap();
        assert!(state.record_availability(entry(11, 6, 1)).is_err());
        assert!(state.advisory().is_none());
    }

    #[test]
    fn clear_color_keeps_version() {
        let mut state = SelectionState::default();
        state.choose_model(1);
        state.choose_version(&version(11, 1)).unwrap();
        state.choose_color(&option(11, 5)).unwrap();
        state.record_availability(entry(11, 5, 0)).unwrap();

        state.clear_color();
        assert_eq!(
            state,
            SelectionState::VersionChosen {
                model_id: 1,
                version_id: 11
            }
        );
    }

    #[test]
    fn stale_lookup_detected_by_parameters() {
        let mut state = SelectionState::default();
        let first = state.choose_model(1);
        let second = state.choose_model(2);

        assert!(!first.is_current(&state));
        assert!(second.is_current(&state));

        // Returning to model 1 makes a model-1 version lookup current again.
        state.choose_model(1);
        assert!(first.is_current(&state));
    }

    #[test]
    fn availability_lookup_goes_stale_on_color_change() {
        let mut state = SelectionState::default();
        state.choose_model(1);
        state.choose_version(&version(11, 1)).unwrap();
        let lookup = state.choose_color(&option(11, 5)).unwrap();
        state.choose_color(&option(11, 6)).unwrap();
        assert!(!lookup.is_current(&state));
    }

    #[test]
    fn serializes_with_stage_tag() {
        let mut state = SelectionState::default();
        state.choose_model(3);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["stage"], "model_chosen");
        assert_eq!(json["model_id"], 3);
    }

    #[derive(Debug, Clone)]
    enum Op {
        ChooseModel(DbId),
        ClearModel,
        ChooseVersion(DbId),
        ClearVersion,
        ChooseColor(DbId, DbId),
        ClearColor,
        Record(DbId, DbId, u32),
    }

    // Versions are numbered `model * 10 + n`, so a version's model is `id / 10`.
    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..4).prop_map(Op::ChooseModel),
            Just(Op::ClearModel),
            (10i64..40).prop_map(Op::ChooseVersion),
            Just(Op::ClearVersion),
            (10i64..40, 1i64..4).prop_map(|(v, c)| Op::ChooseColor(v, c)),
            Just(Op::ClearColor),
            (10i64..40, 1i64..4, 0u32..5).prop_map(|(v, c, q)| Op::Record(v, c, q)),
        ]
    }

    proptest! {
        #[test]
        fn dependent_fields_never_outlive_their_parent(
            ops in proptest::collection::vec(op_strategy(), 0..60)
        ) {
            let mut state = SelectionState::default();

            for op in ops {
                let before = state.clone();
                let result = match op {
                    Op::ChooseModel(m) => { state.choose_model(m); Ok(()) }
                    Op::ClearModel => { state.clear_model(); Ok(()) }
                    Op::ChooseVersion(v) => state.choose_version(&version(v, v / 10)).map(|_| ()),
                    Op::ClearVersion => { state.clear_version(); Ok(()) }
                    Op::ChooseColor(v, c) => state.choose_color(&option(v, c)).map(|_| ()),
                    Op::ClearColor => { state.clear_color(); Ok(()) }
                    Op::Record(v, c, q) => state.record_availability(entry(v, c, q)),
                };

                if result.is_err() {
                    prop_assert_eq!(&state, &before);
                }

                if state.model_id().is_none() {
                    prop_assert!(state.version_id().is_none());
                    prop_assert!(state.color_id().is_none());
                }
                if let Some(v) = state.version_id() {
                    prop_assert_eq!(Some(v / 10), state.model_id());
                }
                if state.color_id().is_some() {
                    prop_assert!(state.version_id().is_some());
                }
                if let Some(advisory) = state.advisory() {
                    prop_assert_eq!(Some(advisory.key), state.stock_key());
                }
            }
        }
    }
}

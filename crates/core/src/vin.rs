//! VIN normalization, structural validation and batch deduplication.
//!
//! [`VinRule::check`] is the single normalization + validation entry point
//! used by both the free-form batch path ([`VinBatch::ingest`]) and the
//! single-entry path ([`VinBatch::ingest_one`]).
//!
//! Candidate lifecycle (one-directional; removal destroys a candidate):
//!
//! ```text
//! Unvalidated -> StructurallyInvalid
//!             -> DuplicateInBatch
//!             -> (store check) -> DuplicateInStore | Accepted
//! ```
//!
//! `Unvalidated` candidates have passed the local checks and are waiting for
//! the authoritative existence check, which runs right before submission.

use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;

use crate::error::CoreError;
use crate::units::UnitProvisioning;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_VIN_PREFIX: &str = "VIN";
pub const DEFAULT_VIN_DIGITS: usize = 10;

/// Upper bound on digits a rule may require.
pub const MAX_VIN_DIGITS: usize = 32;

/// Maximum number of surviving candidates in one batch.
pub const MAX_BATCH_SIZE: usize = 500;

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Structural VIN rule: a fixed prefix followed by exactly N digits.
#[derive(Debug, Clone)]
pub struct VinRule {
    prefix: String,
    digits: usize,
    pattern: Regex,
}

/// Outcome of checking one raw token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VinCheck {
    Valid { normalized: String },
    StructurallyInvalid { raw: String, reason: String },
}

impl VinRule {
    /// Build a rule. The prefix must be non-empty ASCII alphanumeric and
    /// `digits` between 1 and [`MAX_VIN_DIGITS`].
    pub fn new(prefix: &str, digits: usize) -> Result<Self, CoreError> {
        let prefix = prefix.trim().to_ascii_uppercase();
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::Validation(format!(
                "VIN prefix must be non-empty and alphanumeric, got '{prefix}'"
            )));
        }
        if !(1..=MAX_VIN_DIGITS).contains(&digits) {
            return Err(CoreError::Validation(format!(
                "VIN digit count must be between 1 and {MAX_VIN_DIGITS}, got {digits}"
            )));
        }

        let pattern = Regex::new(&format!("^{}[0-9]{{{digits}}}$", regex::escape(&prefix)))
            .map_err(|e| CoreError::Internal(format!("Invalid VIN pattern: {e}")))?;

        Ok(Self {
            prefix,
            digits,
            pattern,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn digits(&self) -> usize {
        self.digits
    }

    /// Canonical comparison form: whitespace removed, ASCII uppercased.
    pub fn normalize(&self, raw: &str) -> String {
        raw.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase()
    }

    /// Normalize `raw` and check it against the structural pattern.
    pub fn check(&self, raw: &str) -> VinCheck {
        let normalized = self.normalize(raw);

        if self.pattern.is_match(&normalized) {
            return VinCheck::Valid { normalized };
        }

        let reason = if normalized.is_empty() {
            "empty identifier".to_string()
        } else if !normalized.starts_with(&self.prefix) {
            format!("must start with '{}'", self.prefix)
        } else {
            format!(
                "must be '{}' followed by exactly {} digits",
                self.prefix, self.digits
            )
        };

        VinCheck::StructurallyInvalid {
            raw: raw.to_string(),
            reason,
        }
    }
}

impl Default for VinRule {
    fn default() -> Self {
        Self::new(DEFAULT_VIN_PREFIX, DEFAULT_VIN_DIGITS).expect("default VIN rule is valid")
    }
}

/// Split free-form operator input into raw tokens.
///
/// Separators are whitespace, commas and semicolons; empty tokens are dropped.
pub fn tokenize(input: &str) -> Vec<&str> {
    input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|t| !t.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VinValidationState {
    /// Passed local checks, awaiting the store check.
    Unvalidated,
    StructurallyInvalid,
    DuplicateInBatch,
    DuplicateInStore,
    Accepted,
}

impl VinValidationState {
    /// Still part of the batch (not rejected).
    pub fn is_surviving(&self) -> bool {
        matches!(self, Self::Unvalidated | Self::Accepted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VinCandidate {
    pub raw: String,
    pub normalized: String,
    pub state: VinValidationState,
}

/// Per-token outcome of one ingest call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeReport {
    /// Normalized identifiers added as surviving candidates.
    pub added: Vec<String>,
    /// Raw tokens that failed the structural rule, with the reason.
    pub invalid: Vec<(String, String)>,
    /// Raw tokens that repeat an identifier already in the batch.
    pub duplicates: Vec<String>,
}

/// Result of applying an authoritative existence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCheck {
    pub accepted: usize,
    /// Normalized identifiers already present in the store.
    pub duplicates: Vec<String>,
}

impl StoreCheck {
    pub fn is_clear(&self) -> bool {
        self.duplicates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Candidates being assembled for one unit-creation call, plus its target.
#[derive(Debug, Clone, Default)]
pub struct VinBatch {
    candidates: Vec<VinCandidate>,
    target: Option<UnitProvisioning>,
}

impl VinBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidates(&self) -> &[VinCandidate] {
        &self.candidates
    }

    pub fn target(&self) -> Option<&UnitProvisioning> {
        self.target.as_ref()
    }

    /// Set the template, warehouse, status and dates for the batch.
    pub fn set_target(&mut self, target: UnitProvisioning) -> Result<(), CoreError> {
        target.validate()?;
        self.target = Some(target);
        Ok(())
    }

    /// Candidates still eligible for submission.
    pub fn surviving(&self) -> impl Iterator<Item = &VinCandidate> {
        self.candidates.iter().filter(|c| c.state.is_surviving())
    }

    pub fn surviving_vins(&self) -> Vec<String> {
        self.surviving().map(|c| c.normalized.clone()).collect()
    }

    /// Candidates the store check found already present.
    pub fn store_duplicates(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .filter(|c| c.state == VinValidationState::DuplicateInStore)
            .map(|c| c.normalized.as_str())
            .collect()
    }

    /// Parse free-form input and add every token as a candidate.
    ///
    /// Fails without changing the batch if the surviving candidates would
    /// exceed [`MAX_BATCH_SIZE`].
    pub fn ingest(&mut self, rule: &VinRule, input: &str) -> Result<IntakeReport, CoreError> {
        let mut seen: HashSet<String> = self.surviving().map(|c| c.normalized.clone()).collect();
        let existing = seen.len();
        let mut pending = Vec::new();
        let mut report = IntakeReport::default();

        for raw in tokenize(input) {
            let (candidate, reason) = classify(rule, raw, &mut seen);
            match (candidate.state, reason) {
                (VinValidationState::StructurallyInvalid, Some(reason)) => {
                    report.invalid.push((raw.to_string(), reason));
                }
                (VinValidationState::DuplicateInBatch, _) => {
                    report.duplicates.push(raw.to_string());
                }
                _ => report.added.push(candidate.normalized.clone()),
            }
            pending.push(candidate);
        }

        if existing + report.added.len() > MAX_BATCH_SIZE {
            return Err(CoreError::Validation(format!(
                "A batch may hold at most {MAX_BATCH_SIZE} identifiers"
            )));
        }

        self.candidates.extend(pending);
        Ok(report)
    }

    /// Add a single operator-entered identifier and return its state.
    pub fn ingest_one(
        &mut self,
        rule: &VinRule,
        raw: &str,
    ) -> Result<VinValidationState, CoreError> {
        let mut seen: HashSet<String> = self.surviving().map(|c| c.normalized.clone()).collect();
        let (candidate, _) = classify(rule, raw.trim(), &mut seen);

        if candidate.state.is_surviving() && seen.len() > MAX_BATCH_SIZE {
            return Err(CoreError::Validation(format!(
                "A batch may hold at most {MAX_BATCH_SIZE} identifiers"
            )));
        }

        let state = candidate.state;
        self.candidates.push(candidate);
        Ok(state)
    }

    /// Remove the candidate at `index`.
    pub fn remove(&mut self, index: usize) -> Option<VinCandidate> {
        (index < self.candidates.len()).then(|| self.candidates.remove(index))
    }

    /// Remove every candidate with the given normalized form. Returns how
    /// many were removed.
    pub fn remove_normalized(&mut self, normalized: &str) -> usize {
        let before = self.candidates.len();
        self.candidates.retain(|c| c.normalized != normalized);
        before - self.candidates.len()
    }

    /// Drop every rejected candidate, keeping only survivors.
    pub fn remove_rejected(&mut self) -> usize {
        let before = self.candidates.len();
        self.candidates.retain(|c| c.state.is_surviving());
        before - self.candidates.len()
    }

    /// Apply the store's answer for the surviving set.
    ///
    /// `existing` must hold normalized identifiers. Survivors found in it
    /// become `DuplicateInStore`, the rest `Accepted`.
    pub fn apply_store_check(&mut self, existing: &HashSet<String>) -> StoreCheck {
        let mut check = StoreCheck {
            accepted: 0,
            duplicates: Vec::new(),
        };

        for candidate in self.candidates.iter_mut().filter(|c| c.state.is_surviving()) {
            if existing.contains(&candidate.normalized) {
                candidate.state = VinValidationState::DuplicateInStore;
                check.duplicates.push(candidate.normalized.clone());
            } else {
                candidate.state = VinValidationState::Accepted;
                check.accepted += 1;
            }
        }

        check
    }

    /// The identifiers to submit.
    ///
    /// Requires at least one survivor, every survivor `Accepted`, and no
    /// `DuplicateInStore` candidate left in the batch.
    pub fn accepted_vins(&self) -> Result<Vec<String>, CoreError> {
        let blocked = self.store_duplicates();
        if !blocked.is_empty() {
            return Err(CoreError::Conflict(format!(
                "Already registered: {}",
                blocked.join(", ")
            )));
        }

        let vins: Vec<String> = self.surviving_vins();
        if vins.is_empty() {
            return Err(CoreError::Validation("The batch has no identifiers".into()));
        }
        if self
            .surviving()
            .any(|c| c.state != VinValidationState::Accepted)
        {
            return Err(CoreError::Validation(
                "The batch has not passed the existence check".into(),
            ));
        }
        Ok(vins)
    }

    /// Destroy the batch contents and target.
    pub fn reset(&mut self) {
        self.candidates.clear();
        self.target = None;
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Classify one raw token against the rule and the identifiers already seen.
/// Surviving identifiers are added to `seen`. The reason is set for
/// structurally invalid tokens.
fn classify(
    rule: &VinRule,
    raw: &str,
    seen: &mut HashSet<String>,
) -> (VinCandidate, Option<String>) {
    match rule.check(raw) {
        VinCheck::StructurallyInvalid { raw, reason } => {
            let normalized = rule.normalize(&raw);
            let candidate = VinCandidate {
                raw,
                normalized,
                state: VinValidationState::StructurallyInvalid,
            };
            (candidate, Some(reason))
        }
        VinCheck::Valid { normalized } => {
            let state = if seen.insert(normalized.clone()) {
                VinValidationState::Unvalidated
            } else {
                VinValidationState::DuplicateInBatch
            };
            let candidate = VinCandidate {
                raw: raw.to_string(),
                normalized,
                state,
            };
            (candidate, None)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

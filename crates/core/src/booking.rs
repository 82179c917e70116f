//! Booking request assembly.
//!
//! A booking is one create call carrying a note and one or more line items.
//! Line items are built from complete selections only. Requested quantities
//! are never checked against cached stock: the backend performs admission.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::selection::SelectionState;
use crate::types::DbId;

/// Maximum note length in characters.
pub const MAX_NOTE_LENGTH: usize = 1000;

/// One committed entry of a booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingLineItem {
    pub version_id: DbId,
    pub color_id: DbId,
    pub quantity: u32,
}

/// A line item as entered: a selection plus the requested quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemDraft {
    pub selection: SelectionState,
    pub quantity: u32,
}

impl LineItemDraft {
    pub fn new(selection: SelectionState, quantity: u32) -> Self {
        Self {
            selection,
            quantity,
        }
    }

    /// Convert to a line item; the selection must be complete and the
    /// quantity positive.
    pub fn to_line_item(&self) -> Result<BookingLineItem, CoreError> {
        let key = self.selection.stock_key().ok_or_else(|| {
            CoreError::Validation("Model, version and color must all be selected".into())
        })?;

        if self.quantity == 0 {
            return Err(CoreError::Validation(
                "Requested quantity must be at least 1".into(),
            ));
        }

        Ok(BookingLineItem {
            version_id: key.version_id,
            color_id: key.color_id,
            quantity: self.quantity,
        })
    }
}

/// Body of the create-booking call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateBookingRequest {
    pub note: String,
    pub line_items: Vec<BookingLineItem>,
}

/// Opaque booking identifier returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub String);

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate the note and every draft, producing the request body.
///
/// Fails without side effects when there are no drafts, when any draft is
/// incomplete or has a zero quantity, or when the note is too long. The
/// error names the 1-based line that failed.
pub fn build_booking_request(
    note: &str,
    drafts: &[LineItemDraft],
) -> Result<CreateBookingRequest, CoreError> {
    if drafts.is_empty() {
        return Err(CoreError::Validation(
            "A booking needs at least one line item".into(),
        ));
    }

    let note = note.trim();
    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Note must be at most {MAX_NOTE_LENGTH} characters"
        )));
    }

    let line_items = drafts
        .iter()
        .enumerate()
        .map(|(i, draft)| {
            draft.to_line_item().map_err(|e| match e {
                CoreError::Validation(msg) => CoreError::Validation(format!("Line {}: {msg}", i + 1)),
                other => other,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CreateBookingRequest {
        note: note.to_string(),
        line_items,
    })
}

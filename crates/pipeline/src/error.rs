use evdealer_backend::BackendError;
use evdealer_core::error::CoreError;

/// Errors surfaced by the booking and VIN workflows.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The existence check found identifiers already in the store. Nothing
    /// was submitted; remove them and resubmit.
    #[error("Batch blocked, already registered: {}", duplicates.join(", "))]
    BatchBlocked { duplicates: Vec<String> },

    /// The backend reported a different number of created units than were
    /// submitted.
    #[error("Expected {expected} units to be created, backend reported {created}")]
    UnitCountMismatch { expected: usize, created: u64 },
}

impl PipelineError {
    /// Whether the failed call may still have changed backend state.
    ///
    /// Local validation and blocked batches never reach the create call.
    pub fn may_have_committed(&self) -> bool {
        match self {
            Self::Backend(e) => e.may_have_committed(),
            Self::UnitCountMismatch { .. } => true,
            Self::Core(_) | Self::BatchBlocked { .. } => false,
        }
    }
}

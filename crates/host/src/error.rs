use dynfields_core::{FieldError, UsageError};
use dynfields_storage::StorageError;

/// Errors surfaced by host integration.
///
/// Validation failures are not errors: they come back as
/// [`SaveOutcome::Invalid`](crate::SaveOutcome::Invalid) or
/// [`AssignOutcome::Invalid`](crate::AssignOutcome::Invalid).
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

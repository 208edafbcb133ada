//! Shared error handling for periodic cycles.

use crate::matching::ports::StoreError;
use thiserror::Error;

/// Failure that aborts a whole cycle.
///
/// Per-record problems are logged and reported; only an unusable store ends
/// a cycle early. The driver logs the error and tries again on the next tick.
#[derive(Debug, Clone, Error)]
pub enum CycleError {
    /// The store could not serve a read or a commit.
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Result type for cycle runs.
pub type CycleResult<T> = Result<T, CycleError>;

/// Splits a commit error into a per-record skip or a cycle abort.
///
/// Persistence failures abort. Everything else (version conflicts, lost
/// races on the active-assignment constraint, records that vanished) only
/// concerns the record being committed.
pub(crate) fn skip_or_abort(err: StoreError) -> CycleResult<StoreError> {
    if matches!(err, StoreError::Persistence(_)) {
        Err(CycleError::Store(err))
    } else {
        Ok(err)
    }
}

//! Application-layer error model.

use thiserror::Error;

use billquill_core::DomainError;

use crate::store::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Error returned by the lifecycle services.
///
/// Domain failures (validation, state machine, conflicts) and store failures
/// stay distinguishable so callers can map them to different responses.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// True for conflicts from either layer: domain conflicts (already
    /// converted, stale version) and store duplicates/concurrency failures.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::Domain(DomainError::Conflict(_))
                | EngineError::Store(StoreError::Duplicate(_))
                | EngineError::Store(StoreError::Concurrency { .. })
        )
    }
}

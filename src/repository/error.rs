//! Repository Errors

use std::time::Duration;

use crate::domain::{DomainError, EntityKind};
use crate::store::StoreError;

/// Errors returned by aggregate repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Typed domain outcome (missing entity, bad id, dangling reference)
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A storage call exceeded its deadline
    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),
}

impl RepositoryError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::Domain(DomainError::not_found(kind, id))
    }

    /// Check if this error reports a missing root or child entity
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Domain(DomainError::NotFound { .. }))
    }
}

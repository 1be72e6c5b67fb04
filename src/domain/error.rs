//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::{ChildKind, IdError};

/// Kind of entity a lookup was aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Exhibition,
    Section,
    Room,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Exhibition => write!(f, "exhibition"),
            EntityKind::Section => write!(f, "section"),
            EntityKind::Room => write!(f, "room"),
        }
    }
}

impl From<ChildKind> for EntityKind {
    fn from(kind: ChildKind) -> Self {
        match kind {
            ChildKind::Section => EntityKind::Section,
            ChildKind::Room => EntityKind::Room,
        }
    }
}

/// Errors surfaced to callers of the aggregate operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Root or child entity absent for a supplied id
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Supplied id does not decode into an object identifier
    #[error("Invalid identifier '{value}': {source}")]
    InvalidIdentifier {
        value: String,
        #[source]
        source: IdError,
    },

    /// Composition met a referenced child with no matching document
    #[error("{kind} {child_id} referenced by exhibition {exhibition_id} does not exist")]
    ChildNotFound {
        kind: ChildKind,
        exhibition_id: String,
        child_id: String,
    },

    /// Business rule violation
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),
}

impl DomainError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid_identifier(value: &str, source: IdError) -> Self {
        Self::InvalidIdentifier {
            value: value.to_string(),
            source,
        }
    }
}

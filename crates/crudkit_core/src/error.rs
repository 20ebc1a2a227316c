//! Repository error taxonomy
//!
//! Backing failures are wrapped into this taxonomy exactly once, at the
//! backing boundary. Layers above match on the variants instead of
//! re-wrapping, so a `NotFound` raised deep inside a backing is the same
//! `NotFound` a caller sees.

use thiserror::Error;

type Cause = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by repository backings
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested identifier is absent from the collection
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// Uniqueness or identity conflict
    #[error("conflict on {entity}: {message}")]
    Conflict {
        entity: &'static str,
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// An attribute name that is not declared on the entity
    #[error("unknown field `{field}` on {entity}")]
    UnknownField {
        entity: &'static str,
        field: String,
    },

    /// Any other backing failure
    #[error("repository query failed: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<Cause>,
    },
}

impl RepositoryError {
    /// Creates a not-found error for an entity collection and identifier
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        RepositoryError::NotFound { entity, id: id.to_string() }
    }

    /// Creates a conflict error with no underlying cause
    pub fn conflict(entity: &'static str, message: impl Into<String>) -> Self {
        RepositoryError::Conflict { entity, message: message.into(), source: None }
    }

    /// Creates a conflict error chained to the engine error that caused it
    pub fn conflict_caused_by(
        entity: &'static str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RepositoryError::Conflict {
            entity,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an unknown-field error
    pub fn unknown_field(entity: &'static str, field: impl Into<String>) -> Self {
        RepositoryError::UnknownField { entity, field: field.into() }
    }

    /// Creates a generic query error with no underlying cause
    pub fn query(message: impl Into<String>) -> Self {
        RepositoryError::Query { message: message.into(), source: None }
    }

    /// Creates a generic query error chained to the engine error that caused it
    pub fn query_caused_by(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RepositoryError::Query { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Checks whether this error indicates a missing record
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }

    /// Checks whether this error indicates a uniqueness or identity conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::Conflict { .. })
    }
}

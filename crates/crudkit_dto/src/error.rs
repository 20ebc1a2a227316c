//! Schema definition and validation errors
//!
//! Two distinct failure families live here. [`SchemaError`] is a definition
//! error: the entity's declaration and the requested schema cannot be
//! reconciled, which is a build-time contract violation raised once per
//! derivation and never retried. [`ValidationError`] is a parse-time
//! failure: one payload did not satisfy one schema, reported as a
//! structured list of field errors.

use serde::Serialize;
use thiserror::Error;

/// Definition error raised while deriving a schema
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// The config never received a purpose
    #[error("schema derivation for {entity} requires a purpose")]
    MissingPurpose { entity: &'static str },

    /// A write-visible field has a server-computed default
    #[error("field `{field}` on {entity} has a server-computed default and cannot appear in a write schema")]
    ServerDefault {
        entity: &'static str,
        field: &'static str,
    },

    /// Relationships form a cycle, which has no finite wire representation
    #[error("cyclic relationship through {entity} cannot be represented as a schema")]
    CyclicRelation { entity: &'static str },
}

/// A single field-level parse failure
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Path of the offending field; nested paths use `parent[i].child` form
    pub field: String,
    /// Human-readable description of the failure
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Aggregated parse failure for one payload
///
/// Carries every field error found in the attempt, not just the first, so
/// callers can surface the whole structured list at once.
#[derive(Debug, Clone, Error, Serialize)]
#[error("validation of {entity} failed: {} field error(s)", errors.len())]
pub struct ValidationError {
    pub entity: &'static str,
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub(crate) fn new(entity: &'static str) -> Self {
        ValidationError { entity, errors: Vec::new() }
    }

    pub(crate) fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError { field: field.into(), message: message.into() });
    }

    pub(crate) fn absorb(&mut self, prefix: &str, nested: ValidationError) {
        for error in nested.errors {
            self.errors.push(FieldError {
                field: format!("{prefix}.{}", error.field),
                message: error.message,
            });
        }
    }

    pub(crate) fn into_result(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

//! Service error type
//!
//! Repository, validation, and schema failures pass through transparently:
//! they were wrapped once at their own boundary and the service layer never
//! re-wraps them. The variants added here cover the service layer's own
//! failure modes: callback dispatch to an unknown identity or method, and
//! enqueue failures.

use thiserror::Error;

use crudkit_core::RepositoryError;
use crudkit_dto::{SchemaError, ValidationError};

/// Errors surfaced by the service layer
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A repository failure, passed through unchanged
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A payload failed schema validation, passed through unchanged
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A schema could not be derived, passed through unchanged
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// No service is registered under the requested identity
    ///
    /// Fatal for the task that carried the identity; never retried here.
    #[error("no service registered for identity `{0}`")]
    UnknownService(String),

    /// The resolved service does not route the requested method
    #[error("service `{service}` does not handle method `{method}`")]
    UnknownMethod { service: String, method: String },

    /// A callback envelope could not be enqueued
    #[error("callback enqueue failed: {0}")]
    Callback(String),
}

impl ServiceError {
    /// Checks whether this error is a pass-through missing-record failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::Repository(inner) if inner.is_not_found())
    }

    /// Checks whether this error is a pass-through conflict failure
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Repository(inner) if inner.is_conflict())
    }
}

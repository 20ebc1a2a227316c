//! Generic Service Layer
//!
//! This crate provides the external-facing seam of the crudkit toolkit: a
//! generic CRUD service over one repository instance, the process-wide
//! service identity registry, and the background-callback dispatch
//! contract.
//!
//! # Architecture
//!
//! Callers (HTTP handlers, background-job consumers) talk to a
//! [`CrudService`], which delegates to whichever repository backing it was
//! constructed with. Mutating operations emit [`CallbackEnvelope`]s through
//! an optional [`CallbackSink`]; a worker on the other side of the queue
//! hands received envelopes to a [`ServiceRegistry`], which resolves the
//! service identity, parses the payload through the entity's read schema,
//! and invokes the named method.

pub mod error;
pub mod registry;
pub mod service;
pub mod sink;

pub use error::ServiceError;
pub use registry::ServiceRegistry;
pub use service::{CrudService, RECEIVE_CALLBACK};
pub use sink::{CallbackEnvelope, CallbackSink, MemorySink};

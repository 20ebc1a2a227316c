//! Schema Derivation
//!
//! This crate derives constrained wire schemas from entity declarations.
//! Given an entity type, a purpose (read or write), and an optional
//! exclusion set, it walks the entity's field descriptors once and produces
//! a [`Schema`] that can parse untyped JSON records into validated
//! instances and project them back into entities. Results are cached per
//! (entity type, purpose, exclusion set).
//!
//! # Field selection
//!
//! A field appears in a read schema unless marked private or write-only,
//! and in a write schema unless marked private, read-only, or explicitly
//! excluded. Relationship fields recurse into the related entity's schema.
//! A write-visible field whose default can only be computed by the storage
//! engine fails derivation: that is a definition error, not a runtime one.
//!
//! # Example
//!
//! ```rust,ignore
//! let write = Schema::derive::<Author>(&DtoConfig::write())?;
//! let parsed = write.parse(&serde_json::json!({
//!     "name": "Agatha Christie",
//!     "dob": "1890-09-15",
//! }))?;
//! let author: Author = parsed.to_entity()?;
//! ```

pub mod error;
pub mod instance;
pub mod schema;
pub mod types;

pub use error::{FieldError, SchemaError, ValidationError};
pub use instance::{DtoInstance, DtoValue};
pub use schema::{Schema, SchemaField};
pub use types::{DtoConfig, Purpose};

//! Core Abstractions
//!
//! This crate provides the shared kernel of the crudkit toolkit: the entity
//! contract and its field metadata, canonical field values, collection
//! filter types, the repository error taxonomy, and the repository
//! interface with its in-memory test double.
//!
//! # Architecture
//!
//! Entities declare their persisted shape as explicit field descriptors.
//! Both repository backings (the PostgreSQL backing in `crudkit_sqlx` and
//! the in-memory backing here) and the schema machinery in `crudkit_dto`
//! are driven entirely off those declarations, so the two backings satisfy
//! one contract and service code never learns which one it holds.
//!
//! # Example
//!
//! ```rust,ignore
//! use crudkit_core::{EqFilter, Filter, LimitOffset, MemoryRepository, Repository};
//!
//! let repo = MemoryRepository::<Author>::new();
//! let author = repo.add(Author::named("Agatha Christie")).await?;
//! let (page, total) = repo
//!     .list_and_count(&[Filter::LimitOffset(LimitOffset::new(10, 0))], &EqFilter::new())
//!     .await?;
//! ```

pub mod entity;
pub mod error;
pub mod filters;
pub mod memory;
pub mod repository;
pub mod value;

pub use entity::{
    descriptor_of, has_field, mapped_scalars, stamp_audit, Entity, ErasedRecord, FieldDefault,
    FieldDescriptor, Mark, Record, Relation, RelationKind, Validator, CREATED_FIELD, UPDATED_FIELD,
};
pub use error::RepositoryError;
pub use filters::{BeforeAfter, CollectionFilter, EqFilter, Filter, LimitOffset};
pub use memory::MemoryRepository;
pub use repository::Repository;
pub use value::{FieldValue, WireType};

//! Repository contract
//!
//! The uniform interface every backing implements. Service code written
//! against this trait is backing-agnostic: tests substitute the in-memory
//! backing for the SQL one with no behavior drift, which the shared
//! contract suite in `test_utils` enforces.

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::RepositoryError;
use crate::filters::{EqFilter, Filter};

/// CRUD, filtered-list, and count operations over a collection of entities
///
/// Each operation issues one or more suspending calls to the backing store
/// and completes its flush boundary before returning, but never commits:
/// transaction boundaries belong to the caller that supplied the
/// unit-of-work handle.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Adds `entity` to the collection
    ///
    /// The returned entity carries the backing-populated identifier and any
    /// server-computed fields.
    ///
    /// # Errors
    ///
    /// `Conflict` when the backing forbids pre-assigned identifiers and
    /// `entity` carries one, or when a uniqueness constraint is violated.
    async fn add(&self, entity: E) -> Result<E, RepositoryError>;

    /// Retrieves the entity identified by `id`
    ///
    /// # Errors
    ///
    /// `NotFound` when no record carries `id`.
    async fn get(&self, id: Uuid) -> Result<E, RepositoryError>;

    /// Lists entities, refined by `filters` and `by`
    ///
    /// Membership and range filters apply first, equality conditions next,
    /// pagination last.
    async fn list(&self, filters: &[Filter], by: &EqFilter) -> Result<Vec<E>, RepositoryError>;

    /// Lists a page of entities together with the pre-pagination total
    ///
    /// The count reflects every refinement except pagination.
    async fn list_and_count(
        &self,
        filters: &[Filter],
        by: &EqFilter,
    ) -> Result<(Vec<E>, i64), RepositoryError>;

    /// Counts entities matching `filters` and `by`, ignoring pagination
    async fn count(&self, filters: &[Filter], by: &EqFilter) -> Result<i64, RepositoryError>;

    /// Merges the supplied fields of `entity` into the stored record that
    /// shares its identifier
    ///
    /// # Errors
    ///
    /// `NotFound` when no stored record shares the identifier.
    async fn update(&self, entity: E) -> Result<E, RepositoryError>;

    /// Updates when the identifier exists, otherwise adds, permitting a
    /// pre-assigned identifier on the add path
    async fn upsert(&self, entity: E) -> Result<E, RepositoryError>;

    /// Removes and returns the entity identified by `id`
    ///
    /// # Errors
    ///
    /// `NotFound` when no record carries `id`.
    async fn delete(&self, id: Uuid) -> Result<E, RepositoryError>;

    /// Narrows the backing's working set to records matching `by`
    ///
    /// Subsequent operations observe only the narrowed collection.
    ///
    /// # Errors
    ///
    /// `UnknownField` when a condition names an undeclared attribute.
    async fn filter_collection(&mut self, by: &EqFilter) -> Result<(), RepositoryError>;
}

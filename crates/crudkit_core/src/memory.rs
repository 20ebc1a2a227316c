//! In-memory repository backing
//!
//! A keyed table behind a lock, reproducing the repository contract exactly
//! so service-layer tests are representative of production behavior:
//! timestamp stamping on add and update, `NotFound` on missing identifiers,
//! `Conflict` on identified adds. Each `MemoryRepository<E>` parametrization
//! owns an isolated table.
//!
//! This backing exists for test substitution only. It has no concurrency
//! protection beyond the lock and is intended for single-threaded test use.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entity::{has_field, mapped_scalars, stamp_audit, Entity};
use crate::error::RepositoryError;
use crate::filters::{EqFilter, Filter, LimitOffset};
use crate::repository::Repository;

/// Repository backing over an in-memory table
#[derive(Debug)]
pub struct MemoryRepository<E: Entity> {
    table: Arc<RwLock<BTreeMap<Uuid, E>>>,
}

impl<E: Entity> Clone for MemoryRepository<E> {
    fn clone(&self) -> Self {
        MemoryRepository { table: Arc::clone(&self.table) }
    }
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryRepository<E> {
    pub fn new() -> Self {
        MemoryRepository { table: Arc::new(RwLock::new(BTreeMap::new())) }
    }

    /// Seeds the table with `entities`
    ///
    /// Entities without an identifier get one assigned; values are stored
    /// exactly as given otherwise, so fixtures control their own timestamps.
    pub async fn seed(&self, entities: impl IntoIterator<Item = E>) {
        let mut table = self.table.write().await;
        for mut entity in entities {
            let id = match entity.id() {
                Some(id) => id,
                None => {
                    let id = Uuid::new_v4();
                    entity.set_id(id);
                    id
                }
            };
            table.insert(id, entity);
        }
    }

    /// Empties the table
    pub async fn clear(&self) {
        self.table.write().await.clear();
    }

    fn find(table: &BTreeMap<Uuid, E>, id: Uuid) -> Result<E, RepositoryError> {
        table.get(&id).cloned().ok_or_else(|| RepositoryError::not_found(E::COLLECTION, id))
    }

    fn require_field(field: &str) -> Result<(), RepositoryError> {
        if has_field::<E>(field) {
            Ok(())
        } else {
            Err(RepositoryError::unknown_field(E::COLLECTION, field))
        }
    }

    /// Applies membership and range refinements, returning the page filter
    /// (last one wins) for the caller to apply after equality conditions.
    fn refine(
        rows: &mut Vec<E>,
        filters: &[Filter],
    ) -> Result<Option<LimitOffset>, RepositoryError> {
        let mut page = None;
        for filter in filters {
            match filter {
                Filter::BeforeAfter(range) => {
                    Self::require_field(&range.field)?;
                    rows.retain(|row| {
                        let Some(value) = row.get(&range.field) else {
                            return false;
                        };
                        let below = range.before.as_ref().map_or(true, |bound| {
                            value.try_cmp(bound) == Some(std::cmp::Ordering::Less)
                        });
                        let above = range.after.as_ref().map_or(true, |bound| {
                            value.try_cmp(bound) == Some(std::cmp::Ordering::Greater)
                        });
                        below && above
                    });
                }
                Filter::Collection(membership) => {
                    Self::require_field(&membership.field)?;
                    if membership.values.is_empty() {
                        continue;
                    }
                    rows.retain(|row| {
                        row.get(&membership.field)
                            .map_or(false, |value| membership.values.contains(&value))
                    });
                }
                Filter::LimitOffset(limit_offset) => page = Some(*limit_offset),
            }
        }
        Ok(page)
    }

    fn apply_eq(rows: &mut Vec<E>, by: &EqFilter) -> Result<(), RepositoryError> {
        for (field, expected) in by.entries() {
            Self::require_field(field)?;
            rows.retain(|row| row.get(field).as_ref() == Some(expected));
        }
        Ok(())
    }

    fn apply_page(rows: Vec<E>, page: Option<LimitOffset>) -> Vec<E> {
        match page {
            Some(LimitOffset { limit, offset }) => rows
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .collect(),
            None => rows,
        }
    }

    /// Membership, range, and equality refinements applied; pagination
    /// returned separately so counts can ignore it.
    async fn refined(
        &self,
        filters: &[Filter],
        by: &EqFilter,
    ) -> Result<(Vec<E>, Option<LimitOffset>), RepositoryError> {
        let table = self.table.read().await;
        let mut rows: Vec<E> = table.values().cloned().collect();
        let page = Self::refine(&mut rows, filters)?;
        Self::apply_eq(&mut rows, by)?;
        Ok((rows, page))
    }

    fn insert_with_id(table: &mut BTreeMap<Uuid, E>, mut entity: E) -> Result<E, RepositoryError> {
        let id = match entity.id() {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                entity.set_id(id);
                id
            }
        };
        stamp_audit(&mut entity, true)?;
        table.insert(id, entity.clone());
        Ok(entity)
    }

    fn merge_into(existing: &mut E, data: &E) -> Result<(), RepositoryError> {
        for descriptor in mapped_scalars::<E>() {
            if let Some(value) = data.get(descriptor.name()) {
                existing.set(descriptor.name(), value)?;
            }
        }
        stamp_audit(existing, false)
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn add(&self, entity: E) -> Result<E, RepositoryError> {
        if entity.id().is_some() {
            return Err(RepositoryError::conflict(
                E::COLLECTION,
                "add received an identified entity",
            ));
        }
        let mut table = self.table.write().await;
        Self::insert_with_id(&mut table, entity)
    }

    async fn get(&self, id: Uuid) -> Result<E, RepositoryError> {
        let table = self.table.read().await;
        Self::find(&table, id)
    }

    async fn list(&self, filters: &[Filter], by: &EqFilter) -> Result<Vec<E>, RepositoryError> {
        let (rows, page) = self.refined(filters, by).await?;
        Ok(Self::apply_page(rows, page))
    }

    async fn list_and_count(
        &self,
        filters: &[Filter],
        by: &EqFilter,
    ) -> Result<(Vec<E>, i64), RepositoryError> {
        let (rows, page) = self.refined(filters, by).await?;
        let total = rows.len() as i64;
        Ok((Self::apply_page(rows, page), total))
    }

    async fn count(&self, filters: &[Filter], by: &EqFilter) -> Result<i64, RepositoryError> {
        let (rows, _) = self.refined(filters, by).await?;
        Ok(rows.len() as i64)
    }

    async fn update(&self, entity: E) -> Result<E, RepositoryError> {
        let id = entity
            .id()
            .ok_or_else(|| RepositoryError::not_found(E::COLLECTION, "(unassigned)"))?;
        let mut table = self.table.write().await;
        let existing = table
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::not_found(E::COLLECTION, id))?;
        Self::merge_into(existing, &entity)?;
        Ok(existing.clone())
    }

    async fn upsert(&self, entity: E) -> Result<E, RepositoryError> {
        let Some(id) = entity.id() else {
            return self.add(entity).await;
        };
        let exists = self.table.read().await.contains_key(&id);
        if exists {
            self.update(entity).await
        } else {
            let mut table = self.table.write().await;
            Self::insert_with_id(&mut table, entity)
        }
    }

    async fn delete(&self, id: Uuid) -> Result<E, RepositoryError> {
        let mut table = self.table.write().await;
        table.remove(&id).ok_or_else(|| RepositoryError::not_found(E::COLLECTION, id))
    }

    async fn filter_collection(&mut self, by: &EqFilter) -> Result<(), RepositoryError> {
        for (field, _) in by.entries() {
            Self::require_field(field)?;
        }
        let mut table = self.table.write().await;
        table.retain(|_, row| {
            by.entries()
                .iter()
                .all(|(field, expected)| row.get(field).as_ref() == Some(expected))
        });
        tracing::debug!(entity = E::COLLECTION, remaining = table.len(), "collection narrowed");
        Ok(())
    }
}

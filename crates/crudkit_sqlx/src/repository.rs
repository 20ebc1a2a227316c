//! SQLx repository backing
//!
//! Implements the repository contract against PostgreSQL. Every filter
//! translates to a query clause: range bounds become strict inequalities
//! (each applied independently), membership becomes an `IN` clause skipped
//! when the value set is empty, pagination becomes `LIMIT`/`OFFSET`
//! appended last and never applied to counts. Statements carry a
//! `RETURNING` list so identifiers and server-computed fields are populated
//! on the returned entity before control leaves the operation.
//!
//! Queries are assembled at runtime with [`sqlx::QueryBuilder`] because the
//! table and clause set are generic over the entity declaration, not known
//! at macro-expansion time. Returned entities are plain owned values,
//! detached from the work unit by construction.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crudkit_core::value::WireType;
use crudkit_core::{
    has_field, mapped_scalars, stamp_audit, Entity, EqFilter, FieldValue, Filter, LimitOffset,
    Repository, RepositoryError, CREATED_FIELD,
};

use crate::error::wrap_sqlx_error;
use crate::uow::UnitOfWork;

/// Repository backing over a PostgreSQL table
///
/// Holds the caller-supplied [`UnitOfWork`] plus the equality conditions
/// accumulated through `filter_collection`, which narrow every subsequent
/// operation's working set.
#[derive(Debug)]
pub struct SqlxRepository<E: Entity> {
    uow: Arc<UnitOfWork>,
    scope: Vec<(String, FieldValue)>,
    _entity: PhantomData<fn() -> E>,
}

/// Tracks whether a `WHERE` keyword has been emitted yet
struct Conjunction {
    any: bool,
}

impl Conjunction {
    fn new() -> Self {
        Conjunction { any: false }
    }

    fn connect(&mut self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(if self.any { " AND " } else { " WHERE " });
        self.any = true;
    }
}

fn bind_value(builder: &mut QueryBuilder<'_, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Uuid(v) => builder.push_bind(*v),
        FieldValue::Text(v) => builder.push_bind(v.clone()),
        FieldValue::Integer(v) => builder.push_bind(*v),
        FieldValue::Float(v) => builder.push_bind(*v),
        FieldValue::Boolean(v) => builder.push_bind(*v),
        FieldValue::DateTime(v) => builder.push_bind(*v),
        FieldValue::Date(v) => builder.push_bind(*v),
        FieldValue::Json(v) => builder.push_bind(v.clone()),
    };
}

fn bind_value_separated(separated: &mut Separated<'_, '_, Postgres, &str>, value: &FieldValue) {
    match value {
        FieldValue::Uuid(v) => separated.push_bind(*v),
        FieldValue::Text(v) => separated.push_bind(v.clone()),
        FieldValue::Integer(v) => separated.push_bind(*v),
        FieldValue::Float(v) => separated.push_bind(*v),
        FieldValue::Boolean(v) => separated.push_bind(*v),
        FieldValue::DateTime(v) => separated.push_bind(*v),
        FieldValue::Date(v) => separated.push_bind(*v),
        FieldValue::Json(v) => separated.push_bind(v.clone()),
    };
}

fn column_decode_error(name: &str, error: sqlx::Error) -> RepositoryError {
    RepositoryError::query_caused_by(format!("failed to decode column \"{name}\""), error)
}

impl<E: Entity> SqlxRepository<E> {
    /// Creates a repository operating within `uow`
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        SqlxRepository { uow, scope: Vec::new(), _entity: PhantomData }
    }

    fn require_field(field: &str) -> Result<(), RepositoryError> {
        if has_field::<E>(field) {
            Ok(())
        } else {
            Err(RepositoryError::unknown_field(E::COLLECTION, field))
        }
    }

    /// Quoted, comma-separated list of the persisted scalar columns
    fn columns_sql() -> String {
        mapped_scalars::<E>()
            .map(|descriptor| format!("\"{}\"", descriptor.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Applies membership and range filters, returning the page filter
    /// (last one wins) for the caller to append after all predicates.
    fn apply_filters(
        builder: &mut QueryBuilder<'static, Postgres>,
        conjunction: &mut Conjunction,
        filters: &[Filter],
    ) -> Result<Option<LimitOffset>, RepositoryError> {
        let mut page = None;
        for filter in filters {
            match filter {
                Filter::BeforeAfter(range) => {
                    Self::require_field(&range.field)?;
                    if let Some(bound) = &range.before {
                        conjunction.connect(builder);
                        builder.push(format!("\"{}\" < ", range.field));
                        bind_value(builder, bound);
                    }
                    if let Some(bound) = &range.after {
                        conjunction.connect(builder);
                        builder.push(format!("\"{}\" > ", range.field));
                        bind_value(builder, bound);
                    }
                }
                Filter::Collection(membership) => {
                    Self::require_field(&membership.field)?;
                    if membership.values.is_empty() {
                        continue;
                    }
                    conjunction.connect(builder);
                    builder.push(format!("\"{}\" IN (", membership.field));
                    let mut separated = builder.separated(", ");
                    for value in &membership.values {
                        bind_value_separated(&mut separated, value);
                    }
                    builder.push(")");
                }
                Filter::LimitOffset(limit_offset) => page = Some(*limit_offset),
            }
        }
        Ok(page)
    }

    fn apply_eq(
        builder: &mut QueryBuilder<'static, Postgres>,
        conjunction: &mut Conjunction,
        entries: &[(String, FieldValue)],
    ) -> Result<(), RepositoryError> {
        for (field, value) in entries {
            Self::require_field(field)?;
            conjunction.connect(builder);
            builder.push(format!("\"{field}\" = "));
            bind_value(builder, value);
        }
        Ok(())
    }

    fn apply_page(builder: &mut QueryBuilder<'static, Postgres>, page: Option<LimitOffset>) {
        if let Some(LimitOffset { limit, offset }) = page {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
            builder.push(" OFFSET ");
            builder.push_bind(offset);
        }
    }

    /// Builds the list query: filters, scope, and equality conditions in
    /// the contract order, pagination appended last.
    fn build_select(
        scope: &[(String, FieldValue)],
        filters: &[Filter],
        by: &EqFilter,
        with_total: bool,
    ) -> Result<QueryBuilder<'static, Postgres>, RepositoryError> {
        let total = if with_total { ", count(*) OVER () AS \"_total\"" } else { "" };
        let mut builder = QueryBuilder::new(format!(
            "SELECT {}{} FROM \"{}\"",
            Self::columns_sql(),
            total,
            E::COLLECTION
        ));
        let mut conjunction = Conjunction::new();
        let page = Self::apply_filters(&mut builder, &mut conjunction, filters)?;
        Self::apply_eq(&mut builder, &mut conjunction, scope)?;
        Self::apply_eq(&mut builder, &mut conjunction, by.entries())?;
        Self::apply_page(&mut builder, page);
        Ok(builder)
    }

    /// Builds the count query, ignoring pagination filters entirely
    fn build_count(
        scope: &[(String, FieldValue)],
        filters: &[Filter],
        by: &EqFilter,
    ) -> Result<QueryBuilder<'static, Postgres>, RepositoryError> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT count(\"id\") AS \"_total\" FROM \"{}\"",
            E::COLLECTION
        ));
        let mut conjunction = Conjunction::new();
        Self::apply_filters(&mut builder, &mut conjunction, filters)?;
        Self::apply_eq(&mut builder, &mut conjunction, scope)?;
        Self::apply_eq(&mut builder, &mut conjunction, by.entries())?;
        Ok(builder)
    }

    fn build_insert(entity: &E) -> QueryBuilder<'static, Postgres> {
        let assigned: Vec<(&'static str, FieldValue)> = mapped_scalars::<E>()
            .filter_map(|descriptor| {
                entity.get(descriptor.name()).map(|value| (descriptor.name(), value))
            })
            .collect();
        let mut builder = QueryBuilder::new(format!("INSERT INTO \"{}\" (", E::COLLECTION));
        let mut names = builder.separated(", ");
        for (name, _) in &assigned {
            names.push(format!("\"{name}\""));
        }
        builder.push(") VALUES (");
        let mut values = builder.separated(", ");
        for (_, value) in &assigned {
            bind_value_separated(&mut values, value);
        }
        builder.push(") ");
        builder
    }

    fn decode_row(row: &PgRow) -> Result<E, RepositoryError> {
        let mut entity = E::default();
        for descriptor in mapped_scalars::<E>() {
            let name = descriptor.name();
            let value = match descriptor.wire() {
                WireType::Uuid => row
                    .try_get::<Option<Uuid>, _>(name)
                    .map_err(|error| column_decode_error(name, error))?
                    .map(FieldValue::Uuid),
                WireType::Text => row
                    .try_get::<Option<String>, _>(name)
                    .map_err(|error| column_decode_error(name, error))?
                    .map(FieldValue::Text),
                WireType::Integer => row
                    .try_get::<Option<i64>, _>(name)
                    .map_err(|error| column_decode_error(name, error))?
                    .map(FieldValue::Integer),
                WireType::Float => row
                    .try_get::<Option<f64>, _>(name)
                    .map_err(|error| column_decode_error(name, error))?
                    .map(FieldValue::Float),
                WireType::Boolean => row
                    .try_get::<Option<bool>, _>(name)
                    .map_err(|error| column_decode_error(name, error))?
                    .map(FieldValue::Boolean),
                WireType::DateTime => row
                    .try_get::<Option<DateTime<Utc>>, _>(name)
                    .map_err(|error| column_decode_error(name, error))?
                    .map(FieldValue::DateTime),
                WireType::Date => row
                    .try_get::<Option<NaiveDate>, _>(name)
                    .map_err(|error| column_decode_error(name, error))?
                    .map(FieldValue::Date),
                WireType::Json => row
                    .try_get::<Option<JsonValue>, _>(name)
                    .map_err(|error| column_decode_error(name, error))?
                    .map(FieldValue::Json),
            };
            if let Some(value) = value {
                entity.set(name, value)?;
            }
        }
        Ok(entity)
    }

    async fn fetch_entity(
        &self,
        mut builder: QueryBuilder<'static, Postgres>,
        missing_id: impl std::fmt::Display,
    ) -> Result<E, RepositoryError> {
        let mut conn = self.uow.lock().await;
        let row = builder
            .build()
            .fetch_optional(&mut **conn)
            .await
            .map_err(|error| wrap_sqlx_error(E::COLLECTION, error))?;
        match row {
            Some(row) => Self::decode_row(&row),
            None => Err(RepositoryError::not_found(E::COLLECTION, missing_id)),
        }
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for SqlxRepository<E> {
    async fn add(&self, mut entity: E) -> Result<E, RepositoryError> {
        if entity.id().is_none() {
            entity.set_id(Uuid::new_v4());
        }
        stamp_audit(&mut entity, true)?;
        let mut builder = Self::build_insert(&entity);
        builder.push("RETURNING ");
        builder.push(Self::columns_sql());
        let mut conn = self.uow.lock().await;
        let row = builder
            .build()
            .fetch_one(&mut **conn)
            .await
            .map_err(|error| wrap_sqlx_error(E::COLLECTION, error))?;
        Self::decode_row(&row)
    }

    async fn get(&self, id: Uuid) -> Result<E, RepositoryError> {
        let by = EqFilter::new().eq("id", id);
        let builder = Self::build_select(&self.scope, &[], &by, false)?;
        self.fetch_entity(builder, id).await
    }

    async fn list(&self, filters: &[Filter], by: &EqFilter) -> Result<Vec<E>, RepositoryError> {
        let mut builder = Self::build_select(&self.scope, filters, by, false)?;
        let mut conn = self.uow.lock().await;
        let rows = builder
            .build()
            .fetch_all(&mut **conn)
            .await
            .map_err(|error| wrap_sqlx_error(E::COLLECTION, error))?;
        rows.iter().map(Self::decode_row).collect()
    }

    async fn list_and_count(
        &self,
        filters: &[Filter],
        by: &EqFilter,
    ) -> Result<(Vec<E>, i64), RepositoryError> {
        let mut builder = Self::build_select(&self.scope, filters, by, true)?;
        let rows = {
            let mut conn = self.uow.lock().await;
            builder
                .build()
                .fetch_all(&mut **conn)
                .await
                .map_err(|error| wrap_sqlx_error(E::COLLECTION, error))?
        };
        // the window count only travels on returned rows; an empty page
        // (offset past the end, or a zero limit) still owes the caller the
        // pre-pagination total
        let total = match rows.first() {
            Some(row) => row
                .try_get::<i64, _>("_total")
                .map_err(|error| column_decode_error("_total", error))?,
            None => self.count(filters, by).await?,
        };
        let entities = rows.iter().map(Self::decode_row).collect::<Result<Vec<_>, _>>()?;
        Ok((entities, total))
    }

    async fn count(&self, filters: &[Filter], by: &EqFilter) -> Result<i64, RepositoryError> {
        let mut builder = Self::build_count(&self.scope, filters, by)?;
        let mut conn = self.uow.lock().await;
        let row = builder
            .build()
            .fetch_one(&mut **conn)
            .await
            .map_err(|error| wrap_sqlx_error(E::COLLECTION, error))?;
        row.try_get::<i64, _>("_total").map_err(|error| column_decode_error("_total", error))
    }

    async fn update(&self, mut entity: E) -> Result<E, RepositoryError> {
        let id = entity
            .id()
            .ok_or_else(|| RepositoryError::not_found(E::COLLECTION, "(unassigned)"))?;
        stamp_audit(&mut entity, false)?;
        let assignments: Vec<(&'static str, FieldValue)> = mapped_scalars::<E>()
            .filter(|descriptor| descriptor.name() != "id")
            .filter_map(|descriptor| {
                entity.get(descriptor.name()).map(|value| (descriptor.name(), value))
            })
            .collect();
        if assignments.is_empty() {
            return self.get(id).await;
        }
        let mut builder = QueryBuilder::new(format!("UPDATE \"{}\" SET ", E::COLLECTION));
        for (index, (name, value)) in assignments.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.push(format!("\"{name}\" = "));
            bind_value(&mut builder, value);
        }
        let mut conjunction = Conjunction::new();
        Self::apply_eq(&mut builder, &mut conjunction, &self.scope)?;
        conjunction.connect(&mut builder);
        builder.push("\"id\" = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(Self::columns_sql());
        self.fetch_entity(builder, id).await
    }

    async fn upsert(&self, mut entity: E) -> Result<E, RepositoryError> {
        if entity.id().is_none() {
            return self.add(entity).await;
        }
        stamp_audit(&mut entity, true)?;
        let mut builder = Self::build_insert(&entity);
        builder.push("ON CONFLICT (\"id\") DO UPDATE SET ");
        let merged: Vec<&'static str> = mapped_scalars::<E>()
            .map(|descriptor| descriptor.name())
            .filter(|name| *name != "id" && *name != CREATED_FIELD)
            .filter(|name| entity.get(name).is_some())
            .collect();
        if merged.is_empty() {
            builder.push("\"id\" = EXCLUDED.\"id\"");
        } else {
            for (index, name) in merged.iter().enumerate() {
                if index > 0 {
                    builder.push(", ");
                }
                builder.push(format!("\"{name}\" = EXCLUDED.\"{name}\""));
            }
        }
        builder.push(" RETURNING ");
        builder.push(Self::columns_sql());
        let mut conn = self.uow.lock().await;
        let row = builder
            .build()
            .fetch_one(&mut **conn)
            .await
            .map_err(|error| wrap_sqlx_error(E::COLLECTION, error))?;
        Self::decode_row(&row)
    }

    async fn delete(&self, id: Uuid) -> Result<E, RepositoryError> {
        let mut builder = QueryBuilder::new(format!("DELETE FROM \"{}\"", E::COLLECTION));
        let mut conjunction = Conjunction::new();
        Self::apply_eq(&mut builder, &mut conjunction, &self.scope)?;
        conjunction.connect(&mut builder);
        builder.push("\"id\" = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(Self::columns_sql());
        self.fetch_entity(builder, id).await
    }

    async fn filter_collection(&mut self, by: &EqFilter) -> Result<(), RepositoryError> {
        for (field, _) in by.entries() {
            Self::require_field(field)?;
        }
        self.scope.extend(by.entries().iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudkit_core::{BeforeAfter, CollectionFilter};
    use test_utils::{agatha, Author};

    type AuthorRepo = SqlxRepository<Author>;

    fn scoped(field: &str, value: &str) -> Vec<(String, FieldValue)> {
        vec![(field.to_string(), FieldValue::from(value))]
    }

    #[test]
    fn select_translates_filters_in_contract_order() {
        let filters = vec![
            Filter::BeforeAfter(BeforeAfter::new(
                "dob",
                Some(FieldValue::from("1891-01-01")),
                Some(FieldValue::from("1828-01-01")),
            )),
            Filter::Collection(CollectionFilter::new(
                "name",
                vec![FieldValue::from("Agatha Christie"), FieldValue::from("Leo Tolstoy")],
            )),
            Filter::LimitOffset(LimitOffset::new(10, 5)),
        ];
        let by = EqFilter::new().eq("name", "Agatha Christie");

        let builder = AuthorRepo::build_select(&[], &filters, &by, false)
            .expect("declared fields should build");
        let sql = builder.sql();

        assert!(sql.starts_with("SELECT \"id\", \"name\", \"dob\", \"created\", \"updated\" FROM \"author\""));
        assert!(sql.contains("\"dob\" < $1"));
        assert!(sql.contains("\"dob\" > $2"));
        assert!(sql.contains("\"name\" IN ($3, $4)"));
        assert!(sql.contains("\"name\" = $5"));
        assert!(sql.ends_with("LIMIT $6 OFFSET $7"), "pagination must come last: {sql}");
    }

    #[test]
    fn empty_membership_emits_no_clause() {
        let filters = vec![Filter::Collection(CollectionFilter::new("name", vec![]))];
        let builder = AuthorRepo::build_select(&[], &filters, &EqFilter::new(), false)
            .expect("empty membership is a no-op");
        assert!(!builder.sql().contains("IN"));
        assert!(!builder.sql().contains("WHERE"));
    }

    #[test]
    fn count_query_ignores_pagination() {
        let filters = vec![
            Filter::LimitOffset(LimitOffset::new(3, 9)),
            Filter::Collection(CollectionFilter::new("name", vec![FieldValue::from("x")])),
        ];
        let builder = AuthorRepo::build_count(&[], &filters, &EqFilter::new())
            .expect("count should build");
        let sql = builder.sql();

        assert!(sql.starts_with("SELECT count(\"id\") AS \"_total\" FROM \"author\""));
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("OFFSET"));
        assert!(sql.contains("\"name\" IN ($1)"));
    }

    #[test]
    fn window_total_rides_along_with_the_page() {
        let builder = AuthorRepo::build_select(&[], &[], &EqFilter::new(), true)
            .expect("select should build");
        assert!(builder.sql().contains("count(*) OVER () AS \"_total\""));
    }

    #[test]
    fn undeclared_filter_field_is_an_error() {
        let filters =
            vec![Filter::BeforeAfter(BeforeAfter::new("nope", Some(FieldValue::Integer(1)), None))];
        let err = AuthorRepo::build_select(&[], &filters, &EqFilter::new(), false)
            .expect_err("undeclared field should error");
        assert!(matches!(err, RepositoryError::UnknownField { .. }));
    }

    #[test]
    fn insert_lists_only_assigned_columns() {
        let builder = AuthorRepo::build_insert(&agatha());
        let sql = builder.sql();
        assert!(sql.starts_with("INSERT INTO \"author\" (\"name\", \"dob\") VALUES ($1, $2)"));
        assert!(!sql.contains("\"id\""), "unassigned identifier must be absent: {sql}");
    }

    #[test]
    fn scope_predicates_narrow_every_select() {
        let builder = AuthorRepo::build_select(
            &scoped("name", "Agatha Christie"),
            &[],
            &EqFilter::new(),
            false,
        )
        .expect("scoped select should build");
        assert!(builder.sql().contains("WHERE \"name\" = $1"));
    }
}

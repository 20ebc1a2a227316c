//! Generic CRUD service
//!
//! A service orchestrates exactly one repository and is the single
//! external-facing seam for callers: HTTP handlers and background-job
//! consumers go through the service, never through a backing directly. The
//! default operation bodies delegate to the repository and emit callback
//! envelopes on mutation; concrete services override them to hang
//! cross-cutting behavior off the same extension points.

use async_trait::async_trait;
use uuid::Uuid;

use crudkit_core::{Entity, EqFilter, Filter, Repository};
use crudkit_dto::{DtoConfig, DtoInstance, Schema};

use crate::error::ServiceError;
use crate::sink::{CallbackEnvelope, CallbackSink};

/// Method name routed to [`CrudService::receive_callback`] by default
pub const RECEIVE_CALLBACK: &str = "receive_callback";

/// A service over one entity type and one repository instance
///
/// The repository is constructed against a caller-supplied unit-of-work
/// handle; the service never owns transaction boundaries. Identity is
/// derived from the fully-qualified type path, so it is reproducible
/// across separate process instances, never an address or a hash.
#[async_trait]
pub trait CrudService: Send + Sync + 'static {
    type Entity: Entity;

    /// The repository this service orchestrates
    fn repository(&self) -> &dyn Repository<Self::Entity>;

    /// Destination for callback envelopes, if the application wired one
    fn callbacks(&self) -> Option<&dyn CallbackSink> {
        None
    }

    /// Stable identity of this service type
    fn identity() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Creates an entity
    async fn create(&self, entity: Self::Entity) -> Result<Self::Entity, ServiceError> {
        let created = self.repository().add(entity).await?;
        self.emit(&created).await?;
        Ok(created)
    }

    /// Lists entities, refined by `filters` and `by`
    async fn list(
        &self,
        filters: &[Filter],
        by: &EqFilter,
    ) -> Result<Vec<Self::Entity>, ServiceError> {
        Ok(self.repository().list(filters, by).await?)
    }

    /// Lists a page of entities with the pre-pagination total
    async fn list_and_count(
        &self,
        filters: &[Filter],
        by: &EqFilter,
    ) -> Result<(Vec<Self::Entity>, i64), ServiceError> {
        Ok(self.repository().list_and_count(filters, by).await?)
    }

    /// Counts entities, ignoring pagination
    async fn count(&self, filters: &[Filter], by: &EqFilter) -> Result<i64, ServiceError> {
        Ok(self.repository().count(filters, by).await?)
    }

    /// Retrieves the entity identified by `id`
    ///
    /// A missing identifier propagates the repository's `NotFound`
    /// unchanged.
    async fn get(&self, id: Uuid) -> Result<Self::Entity, ServiceError> {
        Ok(self.repository().get(id).await?)
    }

    /// Updates the entity identified by `id` with the supplied fields
    async fn update(&self, id: Uuid, mut entity: Self::Entity) -> Result<Self::Entity, ServiceError> {
        entity.set_id(id);
        let updated = self.repository().update(entity).await?;
        self.emit(&updated).await?;
        Ok(updated)
    }

    /// Updates the entity identified by `id`, or creates it
    async fn upsert(&self, id: Uuid, mut entity: Self::Entity) -> Result<Self::Entity, ServiceError> {
        entity.set_id(id);
        let upserted = self.repository().upsert(entity).await?;
        self.emit(&upserted).await?;
        Ok(upserted)
    }

    /// Deletes and returns the entity identified by `id`
    async fn delete(&self, id: Uuid) -> Result<Self::Entity, ServiceError> {
        let deleted = self.repository().delete(id).await?;
        self.emit(&deleted).await?;
        Ok(deleted)
    }

    /// Emits a callback envelope for a mutated entity
    ///
    /// No-op without a configured sink. The payload is the entity dumped
    /// through the read schema, so the dispatching worker can parse it back
    /// with no extra context.
    async fn emit(&self, entity: &Self::Entity) -> Result<(), ServiceError> {
        let Some(sink) = self.callbacks() else {
            return Ok(());
        };
        let schema = Schema::derive::<Self::Entity>(&DtoConfig::read())?;
        let envelope =
            CallbackEnvelope::new(Self::identity(), RECEIVE_CALLBACK, schema.dump(entity));
        sink.enqueue(envelope).await
    }

    /// Handles a dispatched callback
    ///
    /// The default implementation records the event; concrete services
    /// override it to do real work. Remember not to block the loop.
    async fn receive_callback(&self, data: DtoInstance) -> Result<(), ServiceError> {
        tracing::info!(
            entity = data.schema().entity(),
            fields = data.set_fields().len(),
            "callback received"
        );
        Ok(())
    }

    /// Routes a dispatched method name to a handler
    ///
    /// Extension point for services that accept more than the default
    /// callback method.
    async fn invoke(&self, method: &str, data: DtoInstance) -> Result<(), ServiceError> {
        match method {
            RECEIVE_CALLBACK => self.receive_callback(data).await,
            other => Err(ServiceError::UnknownMethod {
                service: Self::identity().to_string(),
                method: other.to_string(),
            }),
        }
    }
}

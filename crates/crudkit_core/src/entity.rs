//! Entity contract and field metadata
//!
//! An entity declares its persisted shape once, as a list of
//! [`FieldDescriptor`]s, and exposes its state through canonical
//! [`FieldValue`]s. Everything generic in the toolkit, from both repository
//! backings to schema derivation and wire projection, is driven off that
//! declaration instead of runtime reflection.
//!
//! # Declaring an entity
//!
//! ```rust,ignore
//! impl Entity for Author {
//!     const COLLECTION: &'static str = "author";
//!
//!     fn descriptors() -> &'static [FieldDescriptor] {
//!         static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| vec![
//!             FieldDescriptor::new("id", WireType::Uuid).read_only().server_default(),
//!             FieldDescriptor::new("name", WireType::Text),
//!             FieldDescriptor::new("dob", WireType::Date),
//!             FieldDescriptor::new("created", WireType::DateTime).read_only().server_default(),
//!             FieldDescriptor::new("updated", WireType::DateTime).read_only().server_default(),
//!         ]);
//!         &FIELDS
//!     }
//!     // id / get / set implementations follow the field list
//! }
//! ```

use std::any::{Any, TypeId};

use chrono::Utc;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::value::{FieldValue, WireType};

/// Name of the creation audit timestamp, stamped by the persistence layer
pub const CREATED_FIELD: &str = "created";

/// Name of the modification audit timestamp, stamped by the persistence layer
pub const UPDATED_FIELD: &str = "updated";

/// Visibility of a field towards clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// Readable and writable
    Normal,
    /// Readable, never accepted from clients
    ReadOnly,
    /// Accepted from clients, never serialized back
    WriteOnly,
    /// Invisible in both directions
    Private,
}

/// Default applied when inbound data omits a field
#[derive(Debug, Clone)]
pub enum FieldDefault {
    /// No default; the field must be supplied unless nullable
    None,
    /// A static value
    Value(FieldValue),
    /// A zero-argument factory, evaluated once per parse so every record
    /// gets an independently computed value
    Factory(fn() -> FieldValue),
    /// Computed by the storage engine at persistence time; such a field can
    /// never appear in a write schema
    Server,
}

/// Single-argument validator run after a field value has been coerced
///
/// May transform the value or reject it with a message.
pub type Validator = fn(FieldValue) -> Result<FieldValue, String>;

/// Cardinality of a relationship field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Scalar relationship to a single related record
    One,
    /// Collection relationship to a sequence of related records
    Many,
}

/// Metadata tying a relationship field to its target entity type
///
/// Carries enough erased machinery (`target`, `new_record`) that generic
/// code can recurse into the related type without naming it.
pub struct Relation {
    kind: RelationKind,
    entity: &'static str,
    target: fn() -> TypeId,
    descriptors: fn() -> &'static [FieldDescriptor],
    new_record: fn() -> ErasedRecord,
}

impl Relation {
    /// Declares a scalar relationship to `E`
    pub fn one<E: Entity>() -> Self {
        Relation {
            kind: RelationKind::One,
            entity: E::COLLECTION,
            target: TypeId::of::<E>,
            descriptors: E::descriptors,
            new_record: ErasedRecord::new::<E>,
        }
    }

    /// Declares a collection relationship to `E`
    pub fn many<E: Entity>() -> Self {
        Relation {
            kind: RelationKind::Many,
            entity: E::COLLECTION,
            target: TypeId::of::<E>,
            descriptors: E::descriptors,
            new_record: ErasedRecord::new::<E>,
        }
    }

    /// Cardinality of the relationship
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Collection name of the related entity
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Type identity of the related entity
    pub fn target(&self) -> TypeId {
        (self.target)()
    }

    /// Declared fields of the related entity
    pub fn descriptors(&self) -> &'static [FieldDescriptor] {
        (self.descriptors)()
    }

    /// Creates an unset, type-erased related record
    pub fn new_record(&self) -> ErasedRecord {
        (self.new_record)()
    }
}

impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("kind", &self.kind)
            .field("entity", &self.entity)
            .finish()
    }
}

/// Declared metadata for one entity field
#[derive(Debug)]
pub struct FieldDescriptor {
    name: &'static str,
    wire: WireType,
    wire_override: Option<WireType>,
    mark: Mark,
    nullable: bool,
    default: FieldDefault,
    validators: Vec<Validator>,
    relation: Option<Relation>,
    mapped: bool,
}

impl FieldDescriptor {
    /// Declares a persisted scalar field
    pub fn new(name: &'static str, wire: WireType) -> Self {
        FieldDescriptor {
            name,
            wire,
            wire_override: None,
            mark: Mark::Normal,
            nullable: false,
            default: FieldDefault::None,
            validators: Vec::new(),
            relation: None,
            mapped: true,
        }
    }

    /// Declares a scalar relationship field
    pub fn relation_one<E: Entity>(name: &'static str) -> Self {
        let mut descriptor = FieldDescriptor::new(name, WireType::Json);
        descriptor.relation = Some(Relation::one::<E>());
        descriptor.nullable = true;
        descriptor
    }

    /// Declares a collection relationship field
    pub fn relation_many<E: Entity>(name: &'static str) -> Self {
        let mut descriptor = FieldDescriptor::new(name, WireType::Json);
        descriptor.relation = Some(Relation::many::<E>());
        descriptor.nullable = true;
        descriptor
    }

    /// Declares a field that exists on the struct but is not persisted
    ///
    /// Unmapped fields are invisible to schemas and repository backings.
    pub fn unmapped(name: &'static str, wire: WireType) -> Self {
        let mut descriptor = FieldDescriptor::new(name, wire);
        descriptor.mapped = false;
        descriptor
    }

    /// Marks the field read-only: serialized out, never accepted in
    pub fn read_only(mut self) -> Self {
        self.mark = Mark::ReadOnly;
        self
    }

    /// Marks the field write-only: accepted in, never serialized out
    pub fn write_only(mut self) -> Self {
        self.mark = Mark::WriteOnly;
        self
    }

    /// Marks the field private: invisible in both directions
    pub fn private(mut self) -> Self {
        self.mark = Mark::Private;
        self
    }

    /// Allows the field to be absent or null
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets a static default for inbound data
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Sets a factory default, evaluated per parse
    pub fn default_factory(mut self, factory: fn() -> FieldValue) -> Self {
        self.default = FieldDefault::Factory(factory);
        self
    }

    /// Marks the default as computed by the storage engine
    pub fn server_default(mut self) -> Self {
        self.default = FieldDefault::Server;
        self
    }

    /// Overrides the wire type used by derived schemas
    pub fn wire_as(mut self, wire: WireType) -> Self {
        self.wire_override = Some(wire);
        self
    }

    /// Attaches a validator, run after coercion in attachment order
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Field name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared wire type, before any override
    pub fn wire(&self) -> WireType {
        self.wire
    }

    /// Wire type a schema should use for this field
    pub fn resolved_wire(&self) -> WireType {
        self.wire_override.unwrap_or(self.wire)
    }

    /// Visibility mark
    pub fn mark(&self) -> Mark {
        self.mark
    }

    /// Whether absence or null is acceptable
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Default applied to inbound data
    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    /// Attached validators
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Relationship metadata, if this is a relationship field
    pub fn relation(&self) -> Option<&Relation> {
        self.relation.as_ref()
    }

    /// Whether this field is persisted
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Whether this field is a plain column rather than a relationship
    pub fn is_scalar(&self) -> bool {
        self.relation.is_none()
    }
}

/// Object-safe read view over an entity
///
/// Generic serialization code walks entities through this view so it can
/// recurse into related records without naming their types.
pub trait Record: Send + Sync {
    /// Declared fields of the record's entity type
    fn record_descriptors(&self) -> &'static [FieldDescriptor];

    /// Canonical value of a scalar field, `None` when unset
    fn record_value(&self, field: &str) -> Option<FieldValue>;

    /// Read views over the records related through `field`
    fn record_related(&self, field: &str) -> Option<Vec<&dyn Record>>;
}

impl<E: Entity> Record for E {
    fn record_descriptors(&self) -> &'static [FieldDescriptor] {
        E::descriptors()
    }

    fn record_value(&self, field: &str) -> Option<FieldValue> {
        self.get(field)
    }

    fn record_related(&self, field: &str) -> Option<Vec<&dyn Record>> {
        self.related(field)
    }
}

/// A type-erased entity under construction
///
/// Produced by [`Relation::new_record`] when generic code materializes
/// related records it cannot name statically. The erased setters route back
/// into the concrete entity's [`Entity::set`] and [`Entity::set_related`],
/// and [`ErasedRecord::downcast`] recovers the concrete value at the seam
/// where the type is known again.
pub struct ErasedRecord {
    entity: &'static str,
    inner: Box<dyn Any + Send>,
    set: fn(&mut dyn Any, &str, FieldValue) -> Result<(), RepositoryError>,
    attach: fn(&mut dyn Any, &str, Vec<ErasedRecord>) -> Result<(), RepositoryError>,
}

impl ErasedRecord {
    /// Creates an erased record wrapping `E::default()`
    pub fn new<E: Entity>() -> Self {
        fn set_field<E: Entity>(
            target: &mut dyn Any,
            field: &str,
            value: FieldValue,
        ) -> Result<(), RepositoryError> {
            match target.downcast_mut::<E>() {
                Some(entity) => entity.set(field, value),
                None => Err(RepositoryError::query("erased record holds an unexpected type")),
            }
        }

        fn attach_related<E: Entity>(
            target: &mut dyn Any,
            field: &str,
            related: Vec<ErasedRecord>,
        ) -> Result<(), RepositoryError> {
            match target.downcast_mut::<E>() {
                Some(entity) => entity.set_related(field, related),
                None => Err(RepositoryError::query("erased record holds an unexpected type")),
            }
        }

        ErasedRecord {
            entity: E::COLLECTION,
            inner: Box::new(E::default()),
            set: set_field::<E>,
            attach: attach_related::<E>,
        }
    }

    /// Collection name of the wrapped entity type
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Assigns a scalar field on the wrapped entity
    pub fn set(&mut self, field: &str, value: FieldValue) -> Result<(), RepositoryError> {
        (self.set)(self.inner.as_mut(), field, value)
    }

    /// Attaches related records to a relationship field on the wrapped entity
    pub fn attach(&mut self, field: &str, related: Vec<ErasedRecord>) -> Result<(), RepositoryError> {
        (self.attach)(self.inner.as_mut(), field, related)
    }

    /// Recovers the concrete entity
    ///
    /// # Errors
    ///
    /// Fails when the record wraps a different entity type than requested.
    pub fn downcast<E: Entity>(self) -> Result<E, RepositoryError> {
        self.inner.downcast::<E>().map(|boxed| *boxed).map_err(|_| {
            RepositoryError::query(format!(
                "related record is `{}`, not `{}`",
                self.entity,
                E::COLLECTION
            ))
        })
    }
}

impl std::fmt::Debug for ErasedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasedRecord").field("entity", &self.entity).finish()
    }
}

/// A persisted record with a unique identifier
///
/// Identity is a UUID primary key, generated by the persistence layer when
/// absent. Audit timestamps, when declared under the conventional
/// [`CREATED_FIELD`]/[`UPDATED_FIELD`] names, are stamped by the backings
/// on insert and update, never by callers.
pub trait Entity: Clone + Default + Send + Sync + 'static {
    /// Storage collection (table) name
    const COLLECTION: &'static str;

    /// Declared fields, in declaration order
    fn descriptors() -> &'static [FieldDescriptor];

    /// Primary identifier, if assigned
    fn id(&self) -> Option<Uuid>;

    /// Assigns the primary identifier
    fn set_id(&mut self, id: Uuid);

    /// Canonical value of a declared scalar field
    ///
    /// Returns `None` when the field is unset or null.
    fn get(&self, field: &str) -> Option<FieldValue>;

    /// Assigns a declared scalar field from a canonical value
    ///
    /// # Errors
    ///
    /// `RepositoryError::UnknownField` for an undeclared name, or a query
    /// error when the value shape does not fit the field.
    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), RepositoryError>;

    /// Read views over related records for a relationship field
    fn related(&self, _field: &str) -> Option<Vec<&dyn Record>> {
        None
    }

    /// Attaches materialized related records to a relationship field
    ///
    /// Scalar relationships receive a vector of at most one record.
    fn set_related(
        &mut self,
        field: &str,
        _related: Vec<ErasedRecord>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::unknown_field(Self::COLLECTION, field))
    }
}

/// Checks whether `name` is a declared field of `E`
pub fn has_field<E: Entity>(name: &str) -> bool {
    E::descriptors().iter().any(|descriptor| descriptor.name() == name)
}

/// Looks up the descriptor for a declared field of `E`
pub fn descriptor_of<E: Entity>(name: &str) -> Option<&'static FieldDescriptor> {
    E::descriptors().iter().find(|descriptor| descriptor.name() == name)
}

/// Iterates the persisted scalar fields of `E`
pub fn mapped_scalars<E: Entity>() -> impl Iterator<Item = &'static FieldDescriptor> {
    E::descriptors().iter().filter(|descriptor| descriptor.is_mapped() && descriptor.is_scalar())
}

/// Stamps audit timestamps on an entity
///
/// Sets [`UPDATED_FIELD`] whenever declared, and [`CREATED_FIELD`] as well
/// when `fresh` is true. Entities without audit fields are left untouched.
pub fn stamp_audit<E: Entity>(entity: &mut E, fresh: bool) -> Result<(), RepositoryError> {
    let now = Utc::now();
    if fresh && has_field::<E>(CREATED_FIELD) {
        entity.set(CREATED_FIELD, FieldValue::DateTime(now))?;
    }
    if has_field::<E>(UPDATED_FIELD) {
        entity.set(UPDATED_FIELD, FieldValue::DateTime(now))?;
    }
    Ok(())
}

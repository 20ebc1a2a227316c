//! Schema derivation
//!
//! A schema is derived from an entity's declared field descriptors, once
//! per (entity type, purpose, exclusion set) combination, and cached
//! process-wide. Derivation walks the declaration a single time: it applies
//! the purpose-directed skip rules, resolves each field's wire type,
//! resolves write-direction defaults, and recurses into related entities'
//! schemas for relationship fields. Repeated derivation is idempotent and
//! has no side effect beyond populating the cache.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crudkit_core::{Entity, FieldDefault, FieldDescriptor, Mark};
use crudkit_core::value::WireType;

use crate::error::SchemaError;
use crate::types::{DtoConfig, Purpose};

type CacheKey = (TypeId, Purpose, BTreeSet<String>);

static CACHE: Lazy<Mutex<HashMap<CacheKey, Arc<Schema>>>> = Lazy::new(Default::default);

thread_local! {
    static DERIVING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// One field of a derived schema
#[derive(Debug)]
pub struct SchemaField {
    descriptor: &'static FieldDescriptor,
    wire: WireType,
    related: Option<Arc<Schema>>,
}

impl SchemaField {
    /// Field name
    pub fn name(&self) -> &'static str {
        self.descriptor.name()
    }

    /// Resolved wire type (explicit override wins over the declared type)
    pub fn wire(&self) -> WireType {
        self.wire
    }

    /// The underlying declaration
    pub fn descriptor(&self) -> &'static FieldDescriptor {
        self.descriptor
    }

    /// Schema of the related entity, for relationship fields
    pub fn related(&self) -> Option<&Arc<Schema>> {
        self.related.as_ref()
    }

    /// Whether this field is a relationship
    pub fn is_relation(&self) -> bool {
        self.related.is_some()
    }
}

/// A derived schema for one entity type and purpose
#[derive(Debug)]
pub struct Schema {
    entity: &'static str,
    entity_type: TypeId,
    purpose: Purpose,
    fields: Vec<SchemaField>,
}

impl Schema {
    /// Derives (or fetches from cache) the schema for `E` under `config`
    ///
    /// # Errors
    ///
    /// * `MissingPurpose` when `config` carries no purpose
    /// * `ServerDefault` when a write-visible field can only be computed by
    ///   the storage engine
    /// * `CyclicRelation` when relationship recursion revisits a type
    pub fn derive<E: Entity>(config: &DtoConfig) -> Result<Arc<Schema>, SchemaError> {
        let purpose = config
            .configured_purpose()
            .ok_or(SchemaError::MissingPurpose { entity: E::COLLECTION })?;
        derive_dyn(
            E::COLLECTION,
            TypeId::of::<E>(),
            E::descriptors(),
            purpose,
            config.exclusions(),
        )
    }

    /// Collection name of the entity the schema was derived from
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Type identity of the entity the schema was derived from
    pub fn entity_type(&self) -> TypeId {
        self.entity_type
    }

    /// Direction of the schema
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    /// The derived fields, in declaration order
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Looks up a derived field by name
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Names of the derived fields, in declaration order
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.name()).collect()
    }
}

fn lock_cache() -> std::sync::MutexGuard<'static, HashMap<CacheKey, Arc<Schema>>> {
    CACHE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn derive_dyn(
    entity: &'static str,
    entity_type: TypeId,
    descriptors: &'static [FieldDescriptor],
    purpose: Purpose,
    exclude: &BTreeSet<String>,
) -> Result<Arc<Schema>, SchemaError> {
    let key = (entity_type, purpose, exclude.clone());
    if let Some(schema) = lock_cache().get(&key) {
        return Ok(Arc::clone(schema));
    }

    let cycle = DERIVING.with(|stack| {
        if stack.borrow().contains(&entity_type) {
            true
        } else {
            stack.borrow_mut().push(entity_type);
            false
        }
    });
    if cycle {
        return Err(SchemaError::CyclicRelation { entity });
    }

    let fields = build_fields(entity, descriptors, purpose, exclude);
    DERIVING.with(|stack| {
        stack.borrow_mut().pop();
    });
    let fields = fields?;

    tracing::debug!(entity, ?purpose, fields = fields.len(), "schema derived");
    let schema = Arc::new(Schema { entity, entity_type, purpose, fields });
    // first insertion wins, so concurrent derivations converge on one schema
    let mut cache = lock_cache();
    let cached = cache.entry(key).or_insert(schema);
    Ok(Arc::clone(cached))
}

fn build_fields(
    entity: &'static str,
    descriptors: &'static [FieldDescriptor],
    purpose: Purpose,
    exclude: &BTreeSet<String>,
) -> Result<Vec<SchemaField>, SchemaError> {
    let mut fields = Vec::new();
    for descriptor in descriptors {
        if !descriptor.is_mapped() || excluded(descriptor, purpose, exclude) {
            continue;
        }

        let related = match descriptor.relation() {
            Some(relation) => Some(derive_dyn(
                relation.entity(),
                relation.target(),
                relation.descriptors(),
                purpose,
                &BTreeSet::new(),
            )?),
            None => None,
        };

        if related.is_none()
            && purpose == Purpose::Write
            && matches!(descriptor.default(), FieldDefault::Server)
        {
            return Err(SchemaError::ServerDefault { entity, field: descriptor.name() });
        }

        fields.push(SchemaField {
            descriptor,
            wire: descriptor.resolved_wire(),
            related,
        });
    }
    Ok(fields)
}

fn excluded(descriptor: &FieldDescriptor, purpose: Purpose, exclude: &BTreeSet<String>) -> bool {
    if exclude.contains(descriptor.name()) {
        return true;
    }
    match descriptor.mark() {
        Mark::Private => true,
        Mark::ReadOnly => purpose == Purpose::Write,
        Mark::WriteOnly => purpose == Purpose::Read,
        Mark::Normal => false,
    }
}

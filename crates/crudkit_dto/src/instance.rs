//! Parsing, projection, and wire serialization
//!
//! A derived [`Schema`] round-trips data in three moves: [`Schema::parse`]
//! turns an untyped JSON record into a validated [`DtoInstance`],
//! [`DtoInstance::to_entity`] projects a validated instance back into an
//! entity (recursively materializing related entities), and
//! [`Schema::dump`] serializes an entity outwards with identifiers and
//! timestamps as text.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crudkit_core::{
    Entity, ErasedRecord, FieldDefault, FieldValue, Record, Relation, RelationKind,
    RepositoryError,
};

use crate::error::ValidationError;
use crate::schema::{Schema, SchemaField};
use crate::types::Purpose;

/// A parsed, validated field value
#[derive(Debug, Clone)]
pub enum DtoValue {
    /// A scalar field
    Scalar(FieldValue),
    /// A scalar relationship
    One(DtoInstance),
    /// A collection relationship
    Many(Vec<DtoInstance>),
}

/// A validated instance of a derived schema
///
/// Holds only fields that were present (or defaulted) during the parse;
/// everything else stays unset so the projection leaves those entity
/// fields pending backing-assigned values.
#[derive(Debug, Clone)]
pub struct DtoInstance {
    schema: Arc<Schema>,
    values: BTreeMap<&'static str, DtoValue>,
}

impl DtoInstance {
    /// The schema this instance was parsed through
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// A parsed field value, `None` when the field stayed unset
    pub fn get(&self, field: &str) -> Option<&DtoValue> {
        self.values.get(field)
    }

    /// The parsed scalar value of a field, when set
    pub fn scalar(&self, field: &str) -> Option<&FieldValue> {
        match self.values.get(field) {
            Some(DtoValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    /// Names of the fields that are set
    pub fn set_fields(&self) -> Vec<&'static str> {
        self.values.keys().copied().collect()
    }

    /// Projects the instance into an entity
    ///
    /// Related instances are materialized recursively into related
    /// entities. Fields that stayed unset remain at their entity defaults,
    /// pending backing-assigned values.
    ///
    /// # Errors
    ///
    /// Fails when `E` is not the entity type the schema was derived from,
    /// or when the entity rejects a projected field.
    pub fn to_entity<E: Entity>(&self) -> Result<E, RepositoryError> {
        if TypeId::of::<E>() != self.schema.entity_type() {
            return Err(RepositoryError::query(format!(
                "schema for `{}` cannot project into `{}`",
                self.schema.entity(),
                E::COLLECTION
            )));
        }
        let mut record = ErasedRecord::new::<E>();
        self.fill(&mut record)?;
        record.downcast::<E>()
    }

    fn erase_with(&self, relation: &Relation) -> Result<ErasedRecord, RepositoryError> {
        let mut record = relation.new_record();
        self.fill(&mut record)?;
        Ok(record)
    }

    fn fill(&self, record: &mut ErasedRecord) -> Result<(), RepositoryError> {
        for field in self.schema.fields() {
            let Some(value) = self.values.get(field.name()) else {
                continue;
            };
            match value {
                DtoValue::Scalar(scalar) => record.set(field.name(), scalar.clone())?,
                DtoValue::One(child) => {
                    let relation = relation_of(field)?;
                    record.attach(field.name(), vec![child.erase_with(relation)?])?;
                }
                DtoValue::Many(children) => {
                    let relation = relation_of(field)?;
                    let materialized = children
                        .iter()
                        .map(|child| child.erase_with(relation))
                        .collect::<Result<Vec<_>, _>>()?;
                    record.attach(field.name(), materialized)?;
                }
            }
        }
        Ok(())
    }
}

fn relation_of(field: &SchemaField) -> Result<&'static Relation, RepositoryError> {
    field
        .descriptor()
        .relation()
        .ok_or_else(|| RepositoryError::query(format!("field `{}` is not a relationship", field.name())))
}

impl Schema {
    /// Parses an untyped JSON record into a validated instance
    ///
    /// Field failures are aggregated: the returned error carries every
    /// offending field, with nested relationship paths in
    /// `parent[i].child` form. Validators run after a field's value has
    /// been coerced and may transform or reject it. Write-purposed schemas
    /// apply declared defaults for absent fields; read-purposed schemas
    /// expect all non-nullable fields present.
    pub fn parse(self: &Arc<Self>, raw: &JsonValue) -> Result<DtoInstance, ValidationError> {
        let mut failure = ValidationError::new(self.entity());
        let Some(object) = raw.as_object() else {
            failure.push("(root)", "expected a JSON object");
            return Err(failure);
        };

        let mut values = BTreeMap::new();
        for field in self.fields() {
            if field.is_relation() {
                parse_relation(field, object.get(field.name()), &mut values, &mut failure);
            } else {
                parse_scalar(self.purpose(), field, object.get(field.name()), &mut values, &mut failure);
            }
        }

        failure.into_result()?;
        Ok(DtoInstance { schema: Arc::clone(self), values })
    }

    /// Serializes a record to its wire representation
    ///
    /// Identifiers, timestamps, and dates become text. Unset scalar fields
    /// serialize as null; absent collection relationships as an empty
    /// array, absent scalar relationships as null.
    pub fn dump(&self, record: &dyn Record) -> JsonValue {
        let mut object = serde_json::Map::new();
        for field in self.fields() {
            let value = match (field.related(), field.descriptor().relation()) {
                (Some(child_schema), Some(relation)) => {
                    dump_relation(child_schema, relation, record, field.name())
                }
                _ => record
                    .record_value(field.name())
                    .map(|value| value.to_json())
                    .unwrap_or(JsonValue::Null),
            };
            object.insert(field.name().to_string(), value);
        }
        JsonValue::Object(object)
    }
}

fn dump_relation(
    child_schema: &Arc<Schema>,
    relation: &Relation,
    record: &dyn Record,
    field: &str,
) -> JsonValue {
    match relation.kind() {
        RelationKind::Many => {
            let children = record.record_related(field).unwrap_or_default();
            JsonValue::Array(children.into_iter().map(|child| child_schema.dump(child)).collect())
        }
        RelationKind::One => record
            .record_related(field)
            .and_then(|children| children.into_iter().next().map(|child| child_schema.dump(child)))
            .unwrap_or(JsonValue::Null),
    }
}

fn parse_scalar(
    purpose: Purpose,
    field: &SchemaField,
    raw: Option<&JsonValue>,
    values: &mut BTreeMap<&'static str, DtoValue>,
    failure: &mut ValidationError,
) {
    let descriptor = field.descriptor();
    match raw {
        None | Some(JsonValue::Null) => match (purpose, descriptor.default()) {
            (Purpose::Write, FieldDefault::Value(default)) => {
                values.insert(field.name(), DtoValue::Scalar(default.clone()));
            }
            (Purpose::Write, FieldDefault::Factory(factory)) => {
                values.insert(field.name(), DtoValue::Scalar(factory()));
            }
            _ => {
                if !descriptor.is_nullable() {
                    failure.push(field.name(), "field is required");
                }
            }
        },
        Some(raw_value) => match FieldValue::from_json(field.wire(), raw_value) {
            Ok(Some(coerced)) => {
                let mut value = coerced;
                for validator in descriptor.validators() {
                    match validator(value) {
                        Ok(transformed) => value = transformed,
                        Err(message) => {
                            failure.push(field.name(), message);
                            return;
                        }
                    }
                }
                values.insert(field.name(), DtoValue::Scalar(value));
            }
            Ok(None) => {}
            Err(message) => failure.push(field.name(), message),
        },
    }
}

fn parse_relation(
    field: &SchemaField,
    raw: Option<&JsonValue>,
    values: &mut BTreeMap<&'static str, DtoValue>,
    failure: &mut ValidationError,
) {
    let Some(child_schema) = field.related() else {
        return;
    };
    let kind = field.descriptor().relation().map(Relation::kind);
    match (kind, raw) {
        (_, None) | (_, Some(JsonValue::Null)) => {}
        (Some(RelationKind::Many), Some(JsonValue::Array(items))) => {
            let mut children = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                match child_schema.parse(item) {
                    Ok(child) => children.push(child),
                    Err(nested) => {
                        failure.absorb(&format!("{}[{index}]", field.name()), nested)
                    }
                }
            }
            values.insert(field.name(), DtoValue::Many(children));
        }
        (Some(RelationKind::Many), Some(_)) => {
            failure.push(field.name(), "expected an array of related records");
        }
        (Some(RelationKind::One), Some(item @ JsonValue::Object(_))) => {
            match child_schema.parse(item) {
                Ok(child) => {
                    values.insert(field.name(), DtoValue::One(child));
                }
                Err(nested) => failure.absorb(field.name(), nested),
            }
        }
        (Some(RelationKind::One), Some(_)) => {
            failure.push(field.name(), "expected a related record object");
        }
        (None, _) => {}
    }
}

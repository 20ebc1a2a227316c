//! Schema derivation tests

use std::sync::Arc;

use once_cell::sync::Lazy;
use uuid::Uuid;

use crudkit_core::{Entity, FieldDescriptor, FieldValue, RepositoryError, WireType};
use crudkit_dto::{DtoConfig, Purpose, Schema, SchemaError};
use test_utils::{Author, Book};

// ============================================================================
// Local declarations exercising marks and defaults
// ============================================================================

/// Entity with private and write-only fields
#[derive(Debug, Clone, Default, PartialEq)]
struct Credential {
    id: Option<Uuid>,
    nickname: Option<String>,
    password: Option<String>,
    secret_note: Option<String>,
    pin: Option<String>,
}

impl Entity for Credential {
    const COLLECTION: &'static str = "credential";

    fn descriptors() -> &'static [FieldDescriptor] {
        static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| {
            vec![
                FieldDescriptor::new("id", WireType::Uuid).read_only().server_default(),
                FieldDescriptor::new("nickname", WireType::Text),
                FieldDescriptor::new("password", WireType::Text).write_only(),
                FieldDescriptor::new("secret_note", WireType::Text).private(),
                // stored as an integer, but moves over the wire as text
                FieldDescriptor::new("pin", WireType::Integer).wire_as(WireType::Text),
            ]
        });
        &FIELDS
    }

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }

    fn get(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => self.id.map(FieldValue::Uuid),
            "nickname" => self.nickname.clone().map(FieldValue::Text),
            "password" => self.password.clone().map(FieldValue::Text),
            "secret_note" => self.secret_note.clone().map(FieldValue::Text),
            "pin" => self.pin.clone().map(FieldValue::Text),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), RepositoryError> {
        match (field, value) {
            ("id", FieldValue::Uuid(v)) => self.id = Some(v),
            ("nickname", FieldValue::Text(v)) => self.nickname = Some(v),
            ("password", FieldValue::Text(v)) => self.password = Some(v),
            ("secret_note", FieldValue::Text(v)) => self.secret_note = Some(v),
            ("pin", FieldValue::Text(v)) => self.pin = Some(v),
            (unknown, _) => return Err(RepositoryError::unknown_field(Self::COLLECTION, unknown)),
        }
        Ok(())
    }
}

/// Entity with a server-computed default on a client-writable field
#[derive(Debug, Clone, Default, PartialEq)]
struct Stamped {
    id: Option<Uuid>,
    sequence: Option<i64>,
}

impl Entity for Stamped {
    const COLLECTION: &'static str = "stamped";

    fn descriptors() -> &'static [FieldDescriptor] {
        static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| {
            vec![
                FieldDescriptor::new("id", WireType::Uuid).read_only().server_default(),
                FieldDescriptor::new("sequence", WireType::Integer).server_default(),
            ]
        });
        &FIELDS
    }

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }

    fn get(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => self.id.map(FieldValue::Uuid),
            "sequence" => self.sequence.map(FieldValue::Integer),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), RepositoryError> {
        match (field, value) {
            ("id", FieldValue::Uuid(v)) => self.id = Some(v),
            ("sequence", FieldValue::Integer(v)) => self.sequence = Some(v),
            (unknown, _) => return Err(RepositoryError::unknown_field(Self::COLLECTION, unknown)),
        }
        Ok(())
    }
}

/// Mutually recursive pair for the cycle check
#[derive(Debug, Clone, Default, PartialEq)]
struct Ouro {
    id: Option<Uuid>,
    partner: Option<Box<Boros>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Boros {
    id: Option<Uuid>,
    partner: Option<Box<Ouro>>,
}

macro_rules! impl_cyclic_entity {
    ($name:ident, $collection:literal, $other:ident) => {
        impl Entity for $name {
            const COLLECTION: &'static str = $collection;

            fn descriptors() -> &'static [FieldDescriptor] {
                static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| {
                    vec![
                        FieldDescriptor::new("id", WireType::Uuid).read_only().server_default(),
                        FieldDescriptor::relation_one::<$other>("partner"),
                    ]
                });
                &FIELDS
            }

            fn id(&self) -> Option<Uuid> {
                self.id
            }

            fn set_id(&mut self, id: Uuid) {
                self.id = Some(id);
            }

            fn get(&self, field: &str) -> Option<FieldValue> {
                match field {
                    "id" => self.id.map(FieldValue::Uuid),
                    _ => None,
                }
            }

            fn set(&mut self, field: &str, value: FieldValue) -> Result<(), RepositoryError> {
                match (field, value) {
                    ("id", FieldValue::Uuid(v)) => self.id = Some(v),
                    (unknown, _) => {
                        return Err(RepositoryError::unknown_field(Self::COLLECTION, unknown))
                    }
                }
                Ok(())
            }
        }
    };
}

impl_cyclic_entity!(Ouro, "ouro", Boros);
impl_cyclic_entity!(Boros, "boros", Ouro);

// ============================================================================
// Field selection
// ============================================================================

#[test]
fn write_schema_excludes_read_only_fields() {
    let schema = Schema::derive::<Author>(&DtoConfig::write()).expect("write schema");
    assert_eq!(schema.field_names(), vec!["name", "dob"]);
    assert_eq!(schema.purpose(), Purpose::Write);
}

#[test]
fn read_schema_keeps_read_only_fields_and_relations() {
    let schema = Schema::derive::<Author>(&DtoConfig::read()).expect("read schema");
    assert_eq!(schema.field_names(), vec!["id", "name", "dob", "created", "updated", "books"]);
}

#[test]
fn private_fields_never_appear_in_any_schema() {
    let read = Schema::derive::<Credential>(&DtoConfig::read()).expect("read schema");
    let write = Schema::derive::<Credential>(&DtoConfig::write()).expect("write schema");

    assert!(read.field("secret_note").is_none());
    assert!(write.field("secret_note").is_none());
}

#[test]
fn write_only_fields_are_parse_side_only() {
    let read = Schema::derive::<Credential>(&DtoConfig::read()).expect("read schema");
    let write = Schema::derive::<Credential>(&DtoConfig::write()).expect("write schema");

    assert!(read.field("password").is_none());
    assert!(write.field("password").is_some());
}

#[test]
fn exclusions_remove_fields_by_name() {
    let schema = Schema::derive::<Author>(&DtoConfig::write().exclude("dob"))
        .expect("write schema with exclusion");
    assert_eq!(schema.field_names(), vec!["name"]);
}

#[test]
fn wire_override_wins_over_the_declared_type() {
    let schema = Schema::derive::<Credential>(&DtoConfig::write()).expect("write schema");
    let pin = schema.field("pin").expect("pin field");
    assert_eq!(pin.wire(), WireType::Text);
    assert_eq!(pin.descriptor().wire(), WireType::Integer);
}

// ============================================================================
// Definition errors
// ============================================================================

#[test]
fn purpose_is_mandatory() {
    let err = Schema::derive::<Author>(&DtoConfig::new()).expect_err("no purpose");
    assert!(matches!(err, SchemaError::MissingPurpose { entity: "author" }));
}

#[test]
fn server_defaults_are_rejected_for_write_purpose() {
    let err = Schema::derive::<Stamped>(&DtoConfig::write()).expect_err("server default");
    assert!(matches!(err, SchemaError::ServerDefault { field: "sequence", .. }));

    // the same declaration is fine on the read side
    Schema::derive::<Stamped>(&DtoConfig::read()).expect("read schema");
}

#[test]
fn cyclic_relationships_fail_derivation() {
    let err = Schema::derive::<Ouro>(&DtoConfig::read()).expect_err("cycle");
    assert!(matches!(err, SchemaError::CyclicRelation { .. }));
}

// ============================================================================
// Idempotence and caching
// ============================================================================

#[test]
fn derivation_is_idempotent_and_cached() {
    let first = Schema::derive::<Book>(&DtoConfig::read()).expect("first derivation");
    let second = Schema::derive::<Book>(&DtoConfig::read()).expect("second derivation");

    assert!(Arc::ptr_eq(&first, &second), "same key must hit the cache");
    assert_eq!(first.field_names(), second.field_names());
}

#[test]
fn different_exclusion_sets_are_distinct_cache_entries() {
    let plain = Schema::derive::<Book>(&DtoConfig::write()).expect("plain");
    let narrowed =
        Schema::derive::<Book>(&DtoConfig::write().exclude("author_id")).expect("narrowed");

    assert!(!Arc::ptr_eq(&plain, &narrowed));
    assert!(plain.field("author_id").is_some());
    assert!(narrowed.field("author_id").is_none());
}

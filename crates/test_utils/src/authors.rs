//! Example author domain
//!
//! The entity declarations used across the workspace test suites: an
//! `Author` with read-only identity and audit fields, a `Book` exercising
//! validators, factory defaults, and both relationship cardinalities, and
//! the small related types that hang off it.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use uuid::Uuid;

use crudkit_core::{
    Entity, ErasedRecord, FieldDescriptor, FieldValue, MemoryRepository, Record, Repository,
    RepositoryError, WireType,
};
use crudkit_service::{CallbackSink, CrudService, MemorySink};

/// Rejects blank titles after trimming
pub fn title_not_blank(value: FieldValue) -> Result<FieldValue, String> {
    match &value {
        FieldValue::Text(text) if text.trim().is_empty() => {
            Err("title must not be blank".to_string())
        }
        _ => Ok(value),
    }
}

/// Trims surrounding whitespace from text values
pub fn trimmed(value: FieldValue) -> Result<FieldValue, String> {
    match value {
        FieldValue::Text(text) => Ok(FieldValue::Text(text.trim().to_string())),
        other => Ok(other),
    }
}

fn new_reference() -> FieldValue {
    FieldValue::Uuid(Uuid::new_v4())
}

/// An author with audit columns and a read-only collection of books
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub books: Vec<Book>,
}

impl Author {
    pub fn named(name: impl Into<String>) -> Self {
        Author { name: Some(name.into()), ..Default::default() }
    }
}

impl Entity for Author {
    const COLLECTION: &'static str = "author";

    fn descriptors() -> &'static [FieldDescriptor] {
        static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| {
            vec![
                FieldDescriptor::new("id", WireType::Uuid).read_only().server_default(),
                FieldDescriptor::new("name", WireType::Text).validate(trimmed),
                FieldDescriptor::new("dob", WireType::Date),
                FieldDescriptor::new("created", WireType::DateTime).read_only().server_default(),
                FieldDescriptor::new("updated", WireType::DateTime).read_only().server_default(),
                FieldDescriptor::relation_many::<Book>("books").read_only(),
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
            "name" => self.name.clone().map(FieldValue::Text),
            "dob" => self.dob.map(FieldValue::Date),
            "created" => self.created.map(FieldValue::DateTime),
            "updated" => self.updated.map(FieldValue::DateTime),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), RepositoryError> {
        match (field, value) {
            ("id", FieldValue::Uuid(v)) => self.id = Some(v),
            ("name", FieldValue::Text(v)) => self.name = Some(v),
            ("dob", FieldValue::Date(v)) => self.dob = Some(v),
            ("created", FieldValue::DateTime(v)) => self.created = Some(v),
            ("updated", FieldValue::DateTime(v)) => self.updated = Some(v),
            ("id" | "name" | "dob" | "created" | "updated", other) => {
                return Err(RepositoryError::query(format!(
                    "field `{field}` rejects a {:?} value",
                    other.wire_type()
                )))
            }
            (unknown, _) => return Err(RepositoryError::unknown_field(Self::COLLECTION, unknown)),
        }
        Ok(())
    }

    fn related(&self, field: &str) -> Option<Vec<&dyn Record>> {
        match field {
            "books" => Some(self.books.iter().map(|book| book as &dyn Record).collect()),
            _ => None,
        }
    }

    fn set_related(
        &mut self,
        field: &str,
        related: Vec<ErasedRecord>,
    ) -> Result<(), RepositoryError> {
        match field {
            "books" => {
                self.books = related
                    .into_iter()
                    .map(|record| record.downcast::<Book>())
                    .collect::<Result<_, _>>()?;
                Ok(())
            }
            _ => Err(RepositoryError::unknown_field(Self::COLLECTION, field)),
        }
    }
}

/// A book with a validated title, a factory-defaulted reference, and both
/// relationship cardinalities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Book {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub author_id: Option<Uuid>,
    pub reference: Option<Uuid>,
    pub publisher: Option<Publisher>,
    pub chapters: Vec<Chapter>,
}

impl Book {
    pub fn titled(title: impl Into<String>) -> Self {
        Book { title: Some(title.into()), ..Default::default() }
    }
}

impl Entity for Book {
    const COLLECTION: &'static str = "book";

    fn descriptors() -> &'static [FieldDescriptor] {
        static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| {
            vec![
                FieldDescriptor::new("id", WireType::Uuid).read_only().server_default(),
                FieldDescriptor::new("title", WireType::Text).validate(title_not_blank),
                FieldDescriptor::new("author_id", WireType::Uuid).nullable(),
                FieldDescriptor::new("reference", WireType::Uuid).default_factory(new_reference),
                FieldDescriptor::relation_one::<Publisher>("publisher"),
                FieldDescriptor::relation_many::<Chapter>("chapters"),
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
            "title" => self.title.clone().map(FieldValue::Text),
            "author_id" => self.author_id.map(FieldValue::Uuid),
            "reference" => self.reference.map(FieldValue::Uuid),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), RepositoryError> {
        match (field, value) {
            ("id", FieldValue::Uuid(v)) => self.id = Some(v),
            ("title", FieldValue::Text(v)) => self.title = Some(v),
            ("author_id", FieldValue::Uuid(v)) => self.author_id = Some(v),
            ("reference", FieldValue::Uuid(v)) => self.reference = Some(v),
            ("id" | "title" | "author_id" | "reference", other) => {
                return Err(RepositoryError::query(format!(
                    "field `{field}` rejects a {:?} value",
                    other.wire_type()
                )))
            }
            (unknown, _) => return Err(RepositoryError::unknown_field(Self::COLLECTION, unknown)),
        }
        Ok(())
    }

    fn related(&self, field: &str) -> Option<Vec<&dyn Record>> {
        match field {
            "publisher" => Some(
                self.publisher
                    .as_ref()
                    .map(|publisher| vec![publisher as &dyn Record])
                    .unwrap_or_default(),
            ),
            "chapters" => {
                Some(self.chapters.iter().map(|chapter| chapter as &dyn Record).collect())
            }
            _ => None,
        }
    }

    fn set_related(
        &mut self,
        field: &str,
        related: Vec<ErasedRecord>,
    ) -> Result<(), RepositoryError> {
        match field {
            "publisher" => {
                self.publisher = related
                    .into_iter()
                    .next()
                    .map(|record| record.downcast::<Publisher>())
                    .transpose()?;
                Ok(())
            }
            "chapters" => {
                self.chapters = related
                    .into_iter()
                    .map(|record| record.downcast::<Chapter>())
                    .collect::<Result<_, _>>()?;
                Ok(())
            }
            _ => Err(RepositoryError::unknown_field(Self::COLLECTION, field)),
        }
    }
}

/// A publisher reachable through a scalar relationship
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Publisher {
    pub id: Option<Uuid>,
    pub name: Option<String>,
}

impl Entity for Publisher {
    const COLLECTION: &'static str = "publisher";

    fn descriptors() -> &'static [FieldDescriptor] {
        static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| {
            vec![
                FieldDescriptor::new("id", WireType::Uuid).read_only().server_default(),
                FieldDescriptor::new("name", WireType::Text),
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
            "name" => self.name.clone().map(FieldValue::Text),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), RepositoryError> {
        match (field, value) {
            ("id", FieldValue::Uuid(v)) => self.id = Some(v),
            ("name", FieldValue::Text(v)) => self.name = Some(v),
            ("id" | "name", other) => {
                return Err(RepositoryError::query(format!(
                    "field `{field}` rejects a {:?} value",
                    other.wire_type()
                )))
            }
            (unknown, _) => return Err(RepositoryError::unknown_field(Self::COLLECTION, unknown)),
        }
        Ok(())
    }
}

/// A chapter reachable through a collection relationship
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chapter {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub pages: Option<i64>,
}

impl Entity for Chapter {
    const COLLECTION: &'static str = "chapter";

    fn descriptors() -> &'static [FieldDescriptor] {
        static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| {
            vec![
                FieldDescriptor::new("id", WireType::Uuid).read_only().server_default(),
                FieldDescriptor::new("title", WireType::Text),
                FieldDescriptor::new("pages", WireType::Integer).with_default(0i64),
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
            "title" => self.title.clone().map(FieldValue::Text),
            "pages" => self.pages.map(FieldValue::Integer),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), RepositoryError> {
        match (field, value) {
            ("id", FieldValue::Uuid(v)) => self.id = Some(v),
            ("title", FieldValue::Text(v)) => self.title = Some(v),
            ("pages", FieldValue::Integer(v)) => self.pages = Some(v),
            ("id" | "title" | "pages", other) => {
                return Err(RepositoryError::query(format!(
                    "field `{field}` rejects a {:?} value",
                    other.wire_type()
                )))
            }
            (unknown, _) => return Err(RepositoryError::unknown_field(Self::COLLECTION, unknown)),
        }
        Ok(())
    }
}

/// Agatha Christie, without identity or audit values
pub fn agatha() -> Author {
    Author {
        name: Some("Agatha Christie".to_string()),
        dob: NaiveDate::from_ymd_opt(1890, 9, 15),
        ..Default::default()
    }
}

/// Leo Tolstoy, without identity or audit values
pub fn leo() -> Author {
    Author {
        name: Some("Leo Tolstoy".to_string()),
        dob: NaiveDate::from_ymd_opt(1828, 9, 9),
        ..Default::default()
    }
}

/// The two canonical authors with fixed identifiers and audit values, for
/// seeding a backing directly
pub fn seeded_authors() -> Vec<Author> {
    let epoch = Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).single();
    let mut first = agatha();
    first.id = Uuid::parse_str("97108ac1-ffcb-411d-8b1e-d9183399f63b").ok();
    first.created = epoch;
    first.updated = epoch;
    let mut second = leo();
    second.id = Uuid::parse_str("5ef29f3c-3560-4d15-ba6b-a2e5c721e4d2").ok();
    second.created = epoch;
    second.updated = epoch;
    vec![first, second]
}

/// Service over the author collection, backed by the in-memory table
#[derive(Debug, Clone)]
pub struct AuthorService {
    repository: MemoryRepository<Author>,
    callbacks: Option<MemorySink>,
}

impl AuthorService {
    pub fn new(repository: MemoryRepository<Author>) -> Self {
        AuthorService { repository, callbacks: None }
    }

    pub fn with_callbacks(repository: MemoryRepository<Author>, sink: MemorySink) -> Self {
        AuthorService { repository, callbacks: Some(sink) }
    }
}

impl CrudService for AuthorService {
    type Entity = Author;

    fn repository(&self) -> &dyn Repository<Author> {
        &self.repository
    }

    fn callbacks(&self) -> Option<&dyn CallbackSink> {
        self.callbacks.as_ref().map(|sink| sink as &dyn CallbackSink)
    }
}

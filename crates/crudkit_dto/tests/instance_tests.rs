//! Parse, projection, and serialization tests

use serde_json::json;
use uuid::Uuid;

use crudkit_dto::{DtoConfig, Schema};
use test_utils::{seeded_authors, Author, Book, Chapter, Publisher};

// ============================================================================
// Write direction
// ============================================================================

#[test]
fn write_parse_projects_only_supplied_fields() {
    let schema = Schema::derive::<Author>(&DtoConfig::write()).expect("write schema");
    let parsed = schema
        .parse(&json!({"name": "Agatha Christie", "dob": "1890-09-15"}))
        .expect("payload should validate");

    let author: Author = parsed.to_entity().expect("projection should succeed");
    assert_eq!(author.name.as_deref(), Some("Agatha Christie"));
    assert_eq!(author.dob, chrono::NaiveDate::from_ymd_opt(1890, 9, 15));
    assert_eq!(author.id, None, "identifier stays pending the backing");
    assert_eq!(author.created, None);
    assert_eq!(author.updated, None);
}

#[test]
fn validators_transform_after_coercion() {
    let schema = Schema::derive::<Author>(&DtoConfig::write()).expect("write schema");
    let parsed = schema
        .parse(&json!({"name": "  Agatha Christie  ", "dob": "1890-09-15"}))
        .expect("payload should validate");

    let author: Author = parsed.to_entity().expect("projection should succeed");
    assert_eq!(author.name.as_deref(), Some("Agatha Christie"));
}

#[test]
fn validators_reject_with_field_errors() {
    let schema = Schema::derive::<Book>(&DtoConfig::write()).expect("write schema");
    let err = schema.parse(&json!({"title": "   "})).expect_err("blank title");

    assert_eq!(err.errors.len(), 1);
    assert_eq!(err.errors[0].field, "title");
    assert!(err.errors[0].message.contains("blank"));
}

#[test]
fn parse_failures_are_aggregated_per_attempt() {
    let schema = Schema::derive::<Author>(&DtoConfig::write()).expect("write schema");
    let err = schema
        .parse(&json!({"name": 42, "dob": "yesterday"}))
        .expect_err("both fields are wrong");

    let mut fields: Vec<_> = err.errors.iter().map(|error| error.field.as_str()).collect();
    fields.sort_unstable();
    assert_eq!(fields, vec!["dob", "name"]);
}

#[test]
fn missing_required_fields_are_reported() {
    let schema = Schema::derive::<Author>(&DtoConfig::write()).expect("write schema");
    let err = schema.parse(&json!({})).expect_err("nothing supplied");

    let mut fields: Vec<_> = err.errors.iter().map(|error| error.field.as_str()).collect();
    fields.sort_unstable();
    assert_eq!(fields, vec!["dob", "name"]);
}

#[test]
fn static_defaults_fill_absent_fields() {
    let schema = Schema::derive::<Chapter>(&DtoConfig::write()).expect("write schema");
    let parsed = schema.parse(&json!({"title": "One"})).expect("payload should validate");

    let chapter: Chapter = parsed.to_entity().expect("projection should succeed");
    assert_eq!(chapter.pages, Some(0));
}

#[test]
fn factory_defaults_are_computed_per_parse() {
    let schema = Schema::derive::<Book>(&DtoConfig::write()).expect("write schema");

    let first: Book = schema
        .parse(&json!({"title": "Poirot"}))
        .expect("payload should validate")
        .to_entity()
        .expect("projection");
    let second: Book = schema
        .parse(&json!({"title": "Marple"}))
        .expect("payload should validate")
        .to_entity()
        .expect("projection");

    assert!(first.reference.is_some());
    assert!(second.reference.is_some());
    assert_ne!(first.reference, second.reference, "each parse gets its own value");
}

// ============================================================================
// Relationships
// ============================================================================

#[test]
fn nested_relations_materialize_recursively() {
    let schema = Schema::derive::<Book>(&DtoConfig::write()).expect("write schema");
    let parsed = schema
        .parse(&json!({
            "title": "The Mysterious Affair at Styles",
            "publisher": {"name": "Bodley Head"},
            "chapters": [
                {"title": "I Go to Styles", "pages": 18},
                {"title": "The 16th and 17th of July"},
            ],
        }))
        .expect("payload should validate");

    let book: Book = parsed.to_entity().expect("projection should succeed");
    let publisher = book.publisher.as_ref().expect("publisher materialized");
    assert_eq!(publisher.name.as_deref(), Some("Bodley Head"));
    assert_eq!(book.chapters.len(), 2);
    assert_eq!(book.chapters[0].pages, Some(18));
    assert_eq!(book.chapters[1].pages, Some(0), "nested defaults still apply");
}

#[test]
fn nested_failures_carry_their_path() {
    let schema = Schema::derive::<Book>(&DtoConfig::write()).expect("write schema");
    let err = schema
        .parse(&json!({
            "title": "Styles",
            "chapters": [{"title": "fine"}, {"pages": "twelve"}],
        }))
        .expect_err("second chapter is wrong");

    let fields: Vec<_> = err.errors.iter().map(|error| error.field.as_str()).collect();
    assert!(fields.contains(&"chapters[1].title"), "missing title reported: {fields:?}");
    assert!(fields.contains(&"chapters[1].pages"), "bad pages reported: {fields:?}");
}

#[test]
fn relation_shape_mismatches_are_field_errors() {
    let schema = Schema::derive::<Book>(&DtoConfig::write()).expect("write schema");
    let err = schema
        .parse(&json!({"title": "Styles", "chapters": "not-a-list", "publisher": 7}))
        .expect_err("both relations are malformed");

    let mut fields: Vec<_> = err.errors.iter().map(|error| error.field.as_str()).collect();
    fields.sort_unstable();
    assert_eq!(fields, vec!["chapters", "publisher"]);
}

// ============================================================================
// Read direction
// ============================================================================

#[test]
fn dump_serializes_identifiers_and_timestamps_as_text() {
    let schema = Schema::derive::<Author>(&DtoConfig::read()).expect("read schema");
    let author = seeded_authors().remove(0);
    let wire = schema.dump(&author);

    assert_eq!(wire["id"], json!("97108ac1-ffcb-411d-8b1e-d9183399f63b"));
    assert_eq!(wire["name"], json!("Agatha Christie"));
    assert_eq!(wire["dob"], json!("1890-09-15"));
    assert!(wire["created"].is_string());
    assert_eq!(wire["books"], json!([]));
}

#[test]
fn dump_recurses_into_related_records() {
    let schema = Schema::derive::<Author>(&DtoConfig::read()).expect("read schema");
    let mut author = seeded_authors().remove(0);
    author.books = vec![Book {
        id: Some(Uuid::new_v4()),
        title: Some("Styles".to_string()),
        author_id: author.id,
        reference: None,
        publisher: Some(Publisher { id: None, name: Some("Bodley Head".to_string()) }),
        chapters: vec![],
    }];

    let wire = schema.dump(&author);
    let books = wire["books"].as_array().expect("books is an array");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], json!("Styles"));
    assert_eq!(books[0]["publisher"]["name"], json!("Bodley Head"));
}

#[test]
fn read_parse_round_trips_a_dump() {
    let schema = Schema::derive::<Author>(&DtoConfig::read()).expect("read schema");
    let author = seeded_authors().remove(0);

    let parsed = schema.parse(&schema.dump(&author)).expect("dump should parse");
    let back: Author = parsed.to_entity().expect("projection should succeed");

    assert_eq!(back.id, author.id);
    assert_eq!(back.name, author.name);
    assert_eq!(back.created, author.created);
}

#[test]
fn read_parse_applies_no_defaults() {
    let schema = Schema::derive::<Chapter>(&DtoConfig::read()).expect("read schema");
    let err = schema
        .parse(&json!({"id": Uuid::new_v4().to_string(), "title": "One"}))
        .expect_err("pages has no read-side default");

    assert_eq!(err.errors.len(), 1);
    assert_eq!(err.errors[0].field, "pages");
}

#[test]
fn projection_checks_the_entity_type() {
    let schema = Schema::derive::<Chapter>(&DtoConfig::write()).expect("write schema");
    let parsed = schema.parse(&json!({"title": "One"})).expect("payload should validate");

    let err = parsed.to_entity::<Author>().expect_err("wrong entity type");
    assert!(err.to_string().contains("chapter"));
}

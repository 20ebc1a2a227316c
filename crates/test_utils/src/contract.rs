//! Repository contract suite
//!
//! The same cases run against every backing: the in-memory tests call
//! these directly, and the PostgreSQL integration tests call them against
//! a live database, so the two implementations cannot drift apart
//! behaviorally without a test noticing.
//!
//! Each case assumes it starts from an empty collection.

use uuid::Uuid;

use crudkit_core::{
    BeforeAfter, CollectionFilter, EqFilter, FieldValue, Filter, LimitOffset, Repository,
};

use crate::authors::{agatha, leo, Author};

/// Adding an unidentified entity populates identity and audit fields, and
/// the record round-trips through `get`
pub async fn exercise_add_get_roundtrip(repo: &dyn Repository<Author>) {
    let created = repo.add(agatha()).await.expect("add should succeed");
    let id = created.id.expect("identifier should be backing-assigned");
    assert!(created.created.is_some(), "created timestamp should be stamped");
    assert!(created.updated.is_some(), "updated timestamp should be stamped");

    let fetched = repo.get(id).await.expect("get should find the added record");
    assert_eq!(fetched.name, created.name);
    assert_eq!(fetched.dob, created.dob);
    assert_eq!(fetched.id, created.id);
}

/// `get`, `update`, and `delete` on an absent identifier all fail with the
/// not-found kind
pub async fn exercise_missing_identifier_failures(repo: &dyn Repository<Author>) {
    let ghost = Uuid::new_v4();

    let err = repo.get(ghost).await.expect_err("get should fail");
    assert!(err.is_not_found(), "get: expected NotFound, got {err}");

    let mut unsaved = leo();
    unsaved.id = Some(ghost);
    let err = repo.update(unsaved).await.expect_err("update should fail");
    assert!(err.is_not_found(), "update: expected NotFound, got {err}");

    let err = repo.delete(ghost).await.expect_err("delete should fail");
    assert!(err.is_not_found(), "delete: expected NotFound, got {err}");
}

/// Membership filters select by value and are a no-op when empty; range
/// bounds are strict and applied independently
pub async fn exercise_membership_and_range_filters(repo: &dyn Repository<Author>) {
    repo.add(agatha()).await.expect("add agatha");
    repo.add(leo()).await.expect("add leo");

    let unfiltered = repo
        .list(&[Filter::Collection(CollectionFilter::new("name", vec![]))], &EqFilter::new())
        .await
        .expect("empty membership should not filter");
    assert_eq!(unfiltered.len(), 2);

    let just_agatha = repo
        .list(
            &[Filter::Collection(CollectionFilter::new(
                "name",
                vec![FieldValue::from("Agatha Christie")],
            ))],
            &EqFilter::new(),
        )
        .await
        .expect("membership filter should apply");
    assert_eq!(just_agatha.len(), 1);
    assert_eq!(just_agatha[0].name.as_deref(), Some("Agatha Christie"));

    // Tolstoy (1828) is the only one born before 1860
    let born_before = repo
        .list(
            &[Filter::BeforeAfter(BeforeAfter::new(
                "dob",
                Some(FieldValue::Date(date(1860, 1, 1))),
                None,
            ))],
            &EqFilter::new(),
        )
        .await
        .expect("before bound should apply");
    assert_eq!(born_before.len(), 1);
    assert_eq!(born_before[0].name.as_deref(), Some("Leo Tolstoy"));

    let born_after = repo
        .list(
            &[Filter::BeforeAfter(BeforeAfter::new(
                "dob",
                None,
                Some(FieldValue::Date(date(1860, 1, 1))),
            ))],
            &EqFilter::new(),
        )
        .await
        .expect("after bound should apply");
    assert_eq!(born_after.len(), 1);
    assert_eq!(born_after[0].name.as_deref(), Some("Agatha Christie"));

    // both bounds straddling Christie's birthday select exactly her
    let between = repo
        .list(
            &[Filter::BeforeAfter(BeforeAfter::new(
                "dob",
                Some(FieldValue::Date(date(1891, 1, 1))),
                Some(FieldValue::Date(date(1890, 1, 1))),
            ))],
            &EqFilter::new(),
        )
        .await
        .expect("both bounds should apply");
    assert_eq!(between.len(), 1);
    assert_eq!(between[0].name.as_deref(), Some("Agatha Christie"));

    // bounds are strict: the exact birthday matches neither side
    let on_the_day = repo
        .list(
            &[Filter::BeforeAfter(BeforeAfter::new(
                "dob",
                None,
                Some(FieldValue::Date(date(1890, 9, 15))),
            ))],
            &EqFilter::new(),
        )
        .await
        .expect("strict bound should apply");
    assert!(on_the_day.iter().all(|author| author.name.as_deref() != Some("Agatha Christie")));
}

/// Pagination trims the page but never the count
pub async fn exercise_pagination_and_count(repo: &dyn Repository<Author>) {
    for index in 0..5 {
        let mut author = agatha();
        author.name = Some(format!("Author {index}"));
        repo.add(author).await.expect("add should succeed");
    }

    let (page, total) = repo
        .list_and_count(&[Filter::LimitOffset(LimitOffset::new(2, 1))], &EqFilter::new())
        .await
        .expect("list_and_count should succeed");
    assert_eq!(page.len(), 2);
    assert_eq!(total, 5);

    let (short_page, total) = repo
        .list_and_count(&[Filter::LimitOffset(LimitOffset::new(10, 3))], &EqFilter::new())
        .await
        .expect("list_and_count should succeed");
    assert_eq!(short_page.len(), 2);
    assert_eq!(total, 5);

    // an offset past the end yields an empty page, never an empty count
    let (empty_page, total) = repo
        .list_and_count(&[Filter::LimitOffset(LimitOffset::new(2, 10))], &EqFilter::new())
        .await
        .expect("list_and_count should succeed");
    assert!(empty_page.is_empty());
    assert_eq!(total, 5, "count must survive an empty page");

    let (zero_limit_page, total) = repo
        .list_and_count(&[Filter::LimitOffset(LimitOffset::new(0, 0))], &EqFilter::new())
        .await
        .expect("list_and_count should succeed");
    assert!(zero_limit_page.is_empty());
    assert_eq!(total, 5, "count must survive a zero limit");

    let counted = repo
        .count(&[Filter::LimitOffset(LimitOffset::new(1, 0))], &EqFilter::new())
        .await
        .expect("count should succeed");
    assert_eq!(counted, 5, "count must ignore pagination");
}

/// Equality conditions narrow results; an undeclared attribute is an
/// error, not a silent no-op
pub async fn exercise_equality_filtering(repo: &dyn Repository<Author>) {
    repo.add(agatha()).await.expect("add agatha");
    repo.add(leo()).await.expect("add leo");

    let matched = repo
        .list(&[], &EqFilter::new().eq("name", "Leo Tolstoy"))
        .await
        .expect("equality filter should apply");
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name.as_deref(), Some("Leo Tolstoy"));

    let err = repo
        .list(&[], &EqFilter::new().eq("nom_de_plume", "x"))
        .await
        .expect_err("undeclared attribute should error");
    assert!(
        matches!(err, crudkit_core::RepositoryError::UnknownField { .. }),
        "expected UnknownField, got {err}"
    );
}

/// `update` merges the supplied fields into the stored record and bumps
/// the updated timestamp
pub async fn exercise_update_merges_fields(repo: &dyn Repository<Author>) {
    let created = repo.add(agatha()).await.expect("add should succeed");
    let before = created.updated.expect("updated should be stamped");

    let mut patch = Author::named("Mary Westmacott");
    patch.id = created.id;
    let updated = repo.update(patch).await.expect("update should succeed");

    assert_eq!(updated.name.as_deref(), Some("Mary Westmacott"));
    assert_eq!(updated.dob, created.dob, "unsupplied fields keep their stored values");
    assert!(updated.updated.expect("updated should be stamped") >= before);
}

/// `upsert` behaves as update for a present identifier and as an add that
/// permits a pre-assigned identifier for an absent one
pub async fn exercise_upsert_paths(repo: &dyn Repository<Author>) {
    let created = repo.add(agatha()).await.expect("add should succeed");

    let mut replacement = Author::named("A. C. Mallowan");
    replacement.id = created.id;
    let updated = repo.upsert(replacement).await.expect("upsert should update");
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name.as_deref(), Some("A. C. Mallowan"));

    let fresh_id = Uuid::new_v4();
    let mut newcomer = leo();
    newcomer.id = Some(fresh_id);
    let inserted = repo.upsert(newcomer).await.expect("upsert should insert");
    assert_eq!(inserted.id, Some(fresh_id));

    let fetched = repo.get(fresh_id).await.expect("inserted record should be retrievable");
    assert_eq!(fetched.name.as_deref(), Some("Leo Tolstoy"));
}

/// `filter_collection` narrows the working set for every later operation
pub async fn exercise_filter_collection(repo: &mut dyn Repository<Author>) {
    let kept = repo.add(agatha()).await.expect("add agatha");
    let dropped = repo.add(leo()).await.expect("add leo");

    let err = repo
        .filter_collection(&EqFilter::new().eq("shoe_size", 43i64))
        .await
        .expect_err("undeclared attribute should error");
    assert!(matches!(err, crudkit_core::RepositoryError::UnknownField { .. }));

    repo.filter_collection(&EqFilter::new().eq("name", "Agatha Christie"))
        .await
        .expect("narrowing should succeed");

    let visible = repo.list(&[], &EqFilter::new()).await.expect("list should succeed");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, kept.id);

    let err = repo
        .get(dropped.id.expect("leo has an id"))
        .await
        .expect_err("narrowed-out record should be invisible");
    assert!(err.is_not_found());
}

fn date(year: i32, month: u32, day: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

//! In-memory backing tests
//!
//! The shared contract suite runs here against the in-memory table; the
//! same cases run against PostgreSQL in `crudkit_sqlx`. Cases specific to
//! the test double (identified-add conflict, seeding, table isolation)
//! follow the shared ones.

use proptest::prelude::*;
use uuid::Uuid;

use crudkit_core::{EqFilter, Filter, LimitOffset, MemoryRepository, Repository};
use test_utils::{agatha, contract, random_authors, seeded_authors, Author};

fn repo() -> MemoryRepository<Author> {
    test_utils::init_tracing();
    MemoryRepository::new()
}

// ============================================================================
// Shared contract
// ============================================================================

#[tokio::test]
async fn add_then_get_roundtrip() {
    contract::exercise_add_get_roundtrip(&repo()).await;
}

#[tokio::test]
async fn missing_identifiers_fail_with_not_found() {
    contract::exercise_missing_identifier_failures(&repo()).await;
}

#[tokio::test]
async fn membership_and_range_filters() {
    contract::exercise_membership_and_range_filters(&repo()).await;
}

#[tokio::test]
async fn pagination_trims_pages_but_not_counts() {
    contract::exercise_pagination_and_count(&repo()).await;
}

#[tokio::test]
async fn equality_filtering_and_unknown_attributes() {
    contract::exercise_equality_filtering(&repo()).await;
}

#[tokio::test]
async fn update_merges_supplied_fields() {
    contract::exercise_update_merges_fields(&repo()).await;
}

#[tokio::test]
async fn upsert_updates_or_inserts() {
    contract::exercise_upsert_paths(&repo()).await;
}

#[tokio::test]
async fn filter_collection_narrows_the_working_set() {
    let mut repo = repo();
    contract::exercise_filter_collection(&mut repo).await;
}

// ============================================================================
// Test-double specifics
// ============================================================================

#[tokio::test]
async fn add_rejects_an_identified_entity() {
    let repo = repo();
    let mut author = agatha();
    author.id = Some(Uuid::new_v4());

    let err = repo.add(author).await.expect_err("identified add should conflict");
    assert!(err.is_conflict());
}

#[tokio::test]
async fn update_preserves_the_created_timestamp() {
    let repo = repo();
    let created = repo.add(agatha()).await.expect("add should succeed");

    let mut patch = Author::named("Mary Westmacott");
    patch.id = created.id;
    let updated = repo.update(patch).await.expect("update should succeed");

    assert_eq!(updated.created, created.created);
}

#[tokio::test]
async fn seeded_fixtures_are_retrievable_by_fixed_id() {
    let repo = repo();
    repo.seed(seeded_authors()).await;

    let id = Uuid::parse_str("97108ac1-ffcb-411d-8b1e-d9183399f63b").expect("fixture id");
    let found = repo.get(id).await.expect("seeded record should be present");
    assert_eq!(found.name.as_deref(), Some("Agatha Christie"));

    repo.clear().await;
    let total = repo.count(&[], &EqFilter::new()).await.expect("count should succeed");
    assert_eq!(total, 0);
}

#[tokio::test]
async fn separate_instances_own_separate_tables() {
    let first = repo();
    let second = repo();
    first.add(agatha()).await.expect("add should succeed");

    let total = second.count(&[], &EqFilter::new()).await.expect("count should succeed");
    assert_eq!(total, 0, "tables must not leak between instances");
}

#[tokio::test]
async fn clones_share_one_table() {
    let original = repo();
    let handle = original.clone();
    original.add(agatha()).await.expect("add should succeed");

    let total = handle.count(&[], &EqFilter::new()).await.expect("count should succeed");
    assert_eq!(total, 1);
}

// ============================================================================
// Pagination property
// ============================================================================

proptest! {
    /// list_and_count with LimitOffset(L, O) over N records returns
    /// min(L, max(0, N - O)) rows and a count of N.
    #[test]
    fn pagination_window_matches_formula(
        n in 0usize..24,
        limit in 0i64..10,
        offset in 0i64..30,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let (page_len, total) = runtime.block_on(async {
            let repo = MemoryRepository::<Author>::new();
            repo.seed(random_authors(n)).await;
            let (page, total) = repo
                .list_and_count(
                    &[Filter::LimitOffset(LimitOffset::new(limit, offset))],
                    &EqFilter::new(),
                )
                .await
                .expect("list_and_count should succeed");
            (page.len() as i64, total)
        });

        let expected = limit.min((n as i64 - offset).max(0));
        prop_assert_eq!(page_len, expected);
        prop_assert_eq!(total, n as i64);
    }
}

//! PostgreSQL contract tests
//!
//! Runs the shared repository contract suite against a live database. The
//! suite is ignored by default; point `CRUDKIT_TEST_DATABASE_URL` at a
//! PostgreSQL instance and run:
//!
//! ```text
//! CRUDKIT_TEST_DATABASE_URL=postgres://localhost/crudkit_test \
//!     cargo test -p crudkit_sqlx -- --ignored
//! ```

use std::sync::Arc;

use crudkit_sqlx::{create_pool, DatabaseConfig, DatabasePool, SqlxRepository, UnitOfWork};
use test_utils::{contract, Author};

const CREATE_AUTHOR_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS "author" (
    "id" uuid PRIMARY KEY,
    "name" text,
    "dob" date,
    "created" timestamptz,
    "updated" timestamptz
)
"#;

async fn connect() -> DatabasePool {
    let url = std::env::var("CRUDKIT_TEST_DATABASE_URL")
        .expect("CRUDKIT_TEST_DATABASE_URL must point at a test database");
    let pool = create_pool(&DatabaseConfig::new(url)).await.expect("pool should connect");
    sqlx::query(CREATE_AUTHOR_TABLE).execute(&pool).await.expect("author table");
    pool
}

async fn fresh_repo(pool: &DatabasePool) -> SqlxRepository<Author> {
    sqlx::query("TRUNCATE \"author\"").execute(pool).await.expect("truncate");
    let uow = Arc::new(UnitOfWork::begin(pool).await.expect("begin"));
    SqlxRepository::new(uow)
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set CRUDKIT_TEST_DATABASE_URL)"]
async fn author_contract_suite() {
    test_utils::init_tracing();
    let pool = connect().await;

    contract::exercise_add_get_roundtrip(&fresh_repo(&pool).await).await;
    contract::exercise_missing_identifier_failures(&fresh_repo(&pool).await).await;
    contract::exercise_membership_and_range_filters(&fresh_repo(&pool).await).await;
    contract::exercise_pagination_and_count(&fresh_repo(&pool).await).await;
    contract::exercise_equality_filtering(&fresh_repo(&pool).await).await;
    contract::exercise_update_merges_fields(&fresh_repo(&pool).await).await;
    contract::exercise_upsert_paths(&fresh_repo(&pool).await).await;

    let mut scoped = fresh_repo(&pool).await;
    contract::exercise_filter_collection(&mut scoped).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set CRUDKIT_TEST_DATABASE_URL)"]
async fn unit_of_work_pings_and_rolls_back() {
    let pool = connect().await;
    let uow = UnitOfWork::begin(&pool).await.expect("begin");
    assert!(uow.ping().await.expect("ping should answer"));
    uow.rollback().await.expect("rollback");
}

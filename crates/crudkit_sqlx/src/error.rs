//! Engine error translation
//!
//! All SQLx errors are caught at the backing boundary and re-raised as the
//! repository taxonomy, chained to the original engine error so diagnostics
//! keep the cause. A uniqueness or foreign-key violation becomes a
//! `Conflict`; everything else becomes a generic query failure.

use crudkit_core::RepositoryError;

// PostgreSQL error codes
// https://www.postgresql.org/docs/current/errcodes-appendix.html
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Wraps a SQLx error into the repository taxonomy
pub(crate) fn wrap_sqlx_error(entity: &'static str, error: sqlx::Error) -> RepositoryError {
    let (is_conflict, message) = match &error {
        sqlx::Error::Database(db_error) => {
            let code = db_error.code();
            let conflict = matches!(
                code.as_deref(),
                Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION)
            );
            (conflict, db_error.message().to_string())
        }
        other => (false, other.to_string()),
    };
    if is_conflict {
        RepositoryError::conflict_caused_by(entity, message, error)
    } else {
        RepositoryError::query_caused_by(message, error)
    }
}

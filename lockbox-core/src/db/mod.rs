//! Database layer: connection management, schema capabilities, and
//! migrations.

pub mod capability;
pub mod migrations;
pub mod schema;

pub use capability::{has_column, has_table, SchemaCaps, SchemaVersion};
pub use schema::Database;

use crate::DuplicateKind;

/// Map a SQLite uniqueness-constraint violation to the duplicate it
/// represents.
///
/// Duplicates are derived from the constraint error itself rather than
/// a SELECT-then-INSERT pre-check, so concurrent writers cannot race
/// past the check. Returns `None` for every other error.
pub(crate) fn duplicate_kind(err: &rusqlite::Error) -> Option<DuplicateKind> {
    let rusqlite::Error::SqliteFailure(code, Some(msg)) = err else {
        return None;
    };
    if code.code != rusqlite::ErrorCode::ConstraintViolation {
        return None;
    }

    if msg.contains("users.username") {
        Some(DuplicateKind::Username)
    } else if msg.contains("users.email") {
        Some(DuplicateKind::Email)
    } else if msg.contains("folders.") {
        Some(DuplicateKind::FolderName)
    } else {
        None
    }
}

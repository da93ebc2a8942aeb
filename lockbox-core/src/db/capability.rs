//! Schema capability detection.
//!
//! The application runs against both pre- and post-migration
//! databases, so optional columns and tables are discovered rather
//! than assumed. [`has_table`] and [`has_column`] probe the live
//! schema; [`SchemaCaps::detect`] resolves those probes once into an
//! immutable snapshot that is passed explicitly into every store, so
//! query-shaping decisions are made in one place instead of scattered
//! per-call probes.

use crate::Result;
use rusqlite::Connection;

/// Check whether a table exists in the live schema
pub fn has_table(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Check whether a column exists on a table in the live schema.
///
/// A missing table simply reports the column as absent.
pub fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Resolved snapshot of which optional schema features are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaCaps {
    /// `users.email` exists (uniqueness enforced only then)
    pub users_email: bool,
    /// `users.created_at` / `users.last_login` exist
    pub users_timestamps: bool,
    /// `entries.created_at` / `entries.updated_at` exist
    pub entries_timestamps: bool,
    /// `entries.folder_id` exists
    pub entries_folder_id: bool,
    /// the `folders` table exists
    pub folders_table: bool,
}

/// Schema generation, collapsed from the capability snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Original shape: users + entries, nothing optional
    Legacy,
    /// Profile migration applied: email and timestamps
    WithProfile,
    /// Folders migration applied on top of the profile columns
    WithFolders,
}

impl SchemaCaps {
    /// Probe the live schema once and capture the result.
    ///
    /// Callers hold the snapshot for the lifetime of the store; a
    /// migration run between restarts is picked up on the next
    /// detection.
    pub fn detect(conn: &Connection) -> Result<Self> {
        Ok(Self {
            users_email: has_column(conn, "users", "email")?,
            users_timestamps: has_column(conn, "users", "created_at")?,
            entries_timestamps: has_column(conn, "entries", "created_at")?,
            entries_folder_id: has_column(conn, "entries", "folder_id")?,
            folders_table: has_table(conn, "folders")?,
        })
    }

    /// Collapse the snapshot into the schema generation it implies
    pub fn version(&self) -> SchemaVersion {
        if self.folders_table && self.entries_folder_id {
            SchemaVersion::WithFolders
        } else if self.users_email {
            SchemaVersion::WithProfile
        } else {
            SchemaVersion::Legacy
        }
    }

    /// Snapshot for a fully migrated schema, for tests that construct
    /// stores directly
    pub fn full() -> Self {
        Self {
            users_email: true,
            users_timestamps: true,
            entries_timestamps: true,
            entries_folder_id: true,
            folders_table: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_probes_on_legacy_schema() {
        let db = Database::in_memory().unwrap();
        db.initialize_legacy_schema().unwrap();

        assert!(has_table(db.conn(), "users").unwrap());
        assert!(!has_table(db.conn(), "folders").unwrap());
        assert!(has_column(db.conn(), "users", "username").unwrap());
        assert!(!has_column(db.conn(), "users", "email").unwrap());
        assert!(!has_column(db.conn(), "missing_table", "anything").unwrap());
    }

    #[test]
    fn test_detect_legacy() {
        let db = Database::in_memory().unwrap();
        db.initialize_legacy_schema().unwrap();

        let caps = SchemaCaps::detect(db.conn()).unwrap();
        assert!(!caps.users_email);
        assert!(!caps.entries_folder_id);
        assert!(!caps.folders_table);
        assert_eq!(caps.version(), SchemaVersion::Legacy);
    }

    #[test]
    fn test_detect_migrated() {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();

        let caps = SchemaCaps::detect(db.conn()).unwrap();
        assert_eq!(caps, SchemaCaps::full());
        assert_eq!(caps.version(), SchemaVersion::WithFolders);
    }

    #[test]
    fn test_detect_profile_only() {
        let db = Database::in_memory().unwrap();
        db.initialize_legacy_schema().unwrap();
        crate::db::migrations::add_profile_columns(db.conn()).unwrap();

        let caps = SchemaCaps::detect(db.conn()).unwrap();
        assert!(caps.users_email);
        assert!(caps.entries_timestamps);
        assert!(!caps.folders_table);
        assert_eq!(caps.version(), SchemaVersion::WithProfile);
    }
}

//! Database connection and schema management.

use crate::Result;
use rusqlite::Connection;
use std::path::Path;

/// Main database connection wrapper.
///
/// The application historically ran against two schema generations:
/// the original shape (users + entries only) and the migrated shape
/// with profile columns and folders. [`initialize_legacy_schema`]
/// creates the former; [`initialize_schema`] produces the fully
/// migrated shape a fresh install gets.
///
/// [`initialize_legacy_schema`]: Database::initialize_legacy_schema
/// [`initialize_schema`]: Database::initialize_schema
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self { conn })
    }

    /// Create a new in-memory database for testing
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self { conn })
    }

    /// Create the pre-migration schema: accounts and credential
    /// entries only, no email, no timestamps, no folders.
    pub fn initialize_legacy_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                username TEXT NOT NULL,
                password_encrypted TEXT NOT NULL,
                url TEXT,
                notes TEXT
            );",
        )?;
        Ok(())
    }

    /// Create the current schema: the legacy tables plus every
    /// migration applied.
    pub fn initialize_schema(&self) -> Result<()> {
        self.initialize_legacy_schema()?;
        crate::db::migrations::migrate_to_latest(&self.conn)?;
        Ok(())
    }

    /// Get a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(db: &Database) -> Vec<String> {
        db.conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_legacy_schema_tables() {
        let db = Database::in_memory().unwrap();
        db.initialize_legacy_schema().unwrap();

        let tables = table_names(&db);
        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"entries".to_string()));
        assert!(!tables.contains(&"folders".to_string()));
    }

    #[test]
    fn test_full_schema_tables() {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();

        let tables = table_names(&db);
        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"entries".to_string()));
        assert!(tables.contains(&"folders".to_string()));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();
        db.initialize_schema().unwrap();
    }
}

//! Rolling schema migrations.
//!
//! Two migrations exist, mirroring the database's history: profile
//! columns (email + timestamps) and the folders feature. Each step is
//! guarded by a live column probe so re-running is harmless, and each
//! migration commits as a single transaction.

use crate::db::capability::{has_column, has_table};
use crate::folders::DEFAULT_FOLDERS;
use crate::Result;
use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

/// Add email and timestamp columns to users and entries.
///
/// SQLite cannot attach a UNIQUE constraint through ALTER TABLE, so
/// email uniqueness is enforced by a separate unique index.
pub fn add_profile_columns(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    if !has_column(&tx, "users", "email")? {
        info!("adding email column to users");
        tx.execute("ALTER TABLE users ADD COLUMN email TEXT", [])?;
    }
    tx.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email
         ON users(email) WHERE email IS NOT NULL",
        [],
    )?;

    if !has_column(&tx, "users", "created_at")? {
        info!("adding timestamps to users");
        tx.execute("ALTER TABLE users ADD COLUMN created_at INTEGER", [])?;
        tx.execute("ALTER TABLE users ADD COLUMN last_login INTEGER", [])?;
    }

    if !has_column(&tx, "entries", "created_at")? {
        info!("adding timestamps to entries");
        tx.execute("ALTER TABLE entries ADD COLUMN created_at INTEGER", [])?;
        tx.execute("ALTER TABLE entries ADD COLUMN updated_at INTEGER", [])?;
    }
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_entries_user_created
         ON entries(user_id, created_at)",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

/// Add the folders table, link entries to it, and seed default folders
/// for users who already own entries.
pub fn add_folders_feature(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    if !has_table(&tx, "folders")? {
        info!("creating folders table");
        tx.execute(
            "CREATE TABLE folders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                color TEXT NOT NULL DEFAULT '#3B82F6',
                icon TEXT NOT NULL DEFAULT 'folder',
                created_at INTEGER NOT NULL,
                UNIQUE (user_id, name)
            )",
            [],
        )?;
    }

    if !has_column(&tx, "entries", "folder_id")? {
        info!("adding folder_id column to entries");
        tx.execute(
            "ALTER TABLE entries ADD COLUMN folder_id INTEGER
             REFERENCES folders(id) ON DELETE SET NULL",
            [],
        )?;
    }

    // Existing users get the default set; the unique constraint makes
    // re-seeding a no-op. Their entries stay unorganized.
    let user_ids: Vec<i64> = tx
        .prepare("SELECT DISTINCT user_id FROM entries")?
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let now = Utc::now().timestamp();
    for user_id in user_ids {
        for (name, color, icon) in DEFAULT_FOLDERS {
            tx.execute(
                "INSERT OR IGNORE INTO folders (user_id, name, color, icon, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (user_id, name, color, icon, now),
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Bring any schema generation up to the latest shape. Idempotent.
pub fn migrate_to_latest(conn: &Connection) -> Result<()> {
    add_profile_columns(conn)?;
    add_folders_feature(conn)?;
    Ok(())
}

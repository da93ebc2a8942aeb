//! Credential entry storage: CRUD scoped to the owning user, with
//! passwords encrypted at rest and decrypted only for display.


use crate::crypto::cipher::SecretCipher;
use crate::db::{Database, SchemaCaps};
use crate::{LockboxError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Row, ToSql};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Rendered in place of the password when a stored token cannot be
/// decrypted. One garbled entry never fails a whole listing.
pub const DECRYPT_ERROR_PLACEHOLDER: &str = "Error decrypting";

/// A credential entry with its password decrypted for display
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub folder_id: Option<i64>,
    pub folder_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating an entry
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub folder_id: Option<i64>,
}

/// Input for editing an entry.
///
/// `password: None` leaves the stored ciphertext untouched; only an
/// explicit `Some` re-encrypts. There is no path that re-encrypts
/// whatever a form happened to carry, so a good secret cannot be
/// silently overwritten with a blank.
#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    pub title: String,
    pub username: String,
    pub password: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
}

/// Which entries a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderFilter {
    /// Every entry the user owns
    All,
    /// Entries with no folder (`folder_id IS NULL`)
    Unorganized,
    /// Entries in one specific folder
    Folder(i64),
}

impl FolderFilter {
    /// Decode the front end's filter parameter: absent means all,
    /// `0` is the unorganized sentinel, anything else a folder id.
    pub fn from_param(param: Option<i64>) -> Self {
        match param {
            None => FolderFilter::All,
            Some(0) => FolderFilter::Unorganized,
            Some(id) => FolderFilter::Folder(id),
        }
    }
}

/// Store for credential entries.
///
/// The cipher is injected by the application root; every operation is
/// scoped by the owning user id, so one user can never observe or
/// affect another's entries.
pub struct EntryVault {
    db: Arc<Mutex<Database>>,
    caps: SchemaCaps,
    cipher: SecretCipher,
}

impl EntryVault {
    pub fn new(db: Arc<Mutex<Database>>, caps: SchemaCaps, cipher: SecretCipher) -> Self {
        Self { db, caps, cipher }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| LockboxError::LockPoisoned)
    }

    /// List a user's entries with decrypted passwords.
    ///
    /// Ordered newest-first by `created_at` when the schema has
    /// timestamps, by insertion id otherwise. A token that fails to
    /// decrypt renders the placeholder instead of failing the listing.
    pub fn list_entries(&self, user_id: i64, filter: FolderFilter) -> Result<Vec<Entry>> {
        let caps = self.caps;
        if matches!(filter, FolderFilter::Folder(_)) && !caps.entries_folder_id {
            return Err(LockboxError::SchemaUnsupported("folders"));
        }

        let join_folders = caps.entries_folder_id && caps.folders_table;
        let mut sql = String::from(
            "SELECT e.id, e.user_id, e.title, e.username, e.password_encrypted, e.url, e.notes",
        );
        if caps.entries_folder_id {
            sql.push_str(", e.folder_id");
        }
        if join_folders {
            sql.push_str(", f.name AS folder_name");
        }
        if caps.entries_timestamps {
            sql.push_str(", e.created_at, e.updated_at");
        }
        sql.push_str(" FROM entries e");
        if join_folders {
            sql.push_str(" LEFT JOIN folders f ON f.id = e.folder_id");
        }
        sql.push_str(" WHERE e.user_id = ?1");

        let folder_id_param;
        let mut params: Vec<&dyn ToSql> = vec![&user_id];
        match filter {
            FolderFilter::All => {}
            // On a pre-folders schema every entry is unorganized
            FolderFilter::Unorganized if !caps.entries_folder_id => {}
            FolderFilter::Unorganized => sql.push_str(" AND e.folder_id IS NULL"),
            FolderFilter::Folder(id) => {
                folder_id_param = id;
                params.push(&folder_id_param);
                sql.push_str(" AND e.folder_id = ?2");
            }
        }
        sql.push_str(if caps.entries_timestamps {
            " ORDER BY e.created_at DESC, e.id DESC"
        } else {
            " ORDER BY e.id DESC"
        });

        let db = self.db()?;
        let mut stmt = db.conn().prepare(&sql)?;
        let entries = stmt
            .query_map(params.as_slice(), |row| self.row_to_entry(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Count a user's entries with no folder assignment
    pub fn unorganized_count(&self, user_id: i64) -> Result<i64> {
        let sql = if self.caps.entries_folder_id {
            "SELECT COUNT(*) FROM entries WHERE user_id = ?1 AND folder_id IS NULL"
        } else {
            "SELECT COUNT(*) FROM entries WHERE user_id = ?1"
        };
        let db = self.db()?;
        let count = db.conn().query_row(sql, [user_id], |row| row.get(0))?;
        Ok(count)
    }

    /// Encrypt and store a new entry, returning its id.
    ///
    /// Title, username, and password must be non-empty after trimming.
    /// A folder assignment is persisted only when the schema has the
    /// column; otherwise the entry is stored unorganized.
    pub fn add_entry(&self, user_id: i64, entry: NewEntry) -> Result<i64> {
        let title = entry.title.trim().to_string();
        let username = entry.username.trim().to_string();
        if title.is_empty() || username.is_empty() || entry.password.trim().is_empty() {
            return Err(LockboxError::Validation(
                "Title, username and password are required.".to_string(),
            ));
        }

        let token = self.cipher.encrypt(&entry.password)?;
        let now = Utc::now().timestamp();

        let mut columns: Vec<&str> = vec![
            "user_id",
            "title",
            "username",
            "password_encrypted",
            "url",
            "notes",
        ];
        let mut params: Vec<&dyn ToSql> =
            vec![&user_id, &title, &username, &token, &entry.url, &entry.notes];
        if self.caps.entries_folder_id && entry.folder_id.is_some() {
            columns.push("folder_id");
            params.push(&entry.folder_id);
        }
        if self.caps.entries_timestamps {
            columns.push("created_at");
            params.push(&now);
            columns.push("updated_at");
            params.push(&now);
        }
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO entries ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let db = self.db()?;
        db.conn().execute(&sql, params.as_slice())?;
        Ok(db.conn().last_insert_rowid())
    }

    /// Update an entry owned by the given user.
    ///
    /// Ownership is enforced by the `(id, user_id)` match in the
    /// UPDATE itself; an entry owned by someone else reports
    /// [`LockboxError::NotFound`] exactly like a missing one.
    pub fn update_entry(&self, entry_id: i64, user_id: i64, update: EntryUpdate) -> Result<()> {
        let title = update.title.trim().to_string();
        let username = update.username.trim().to_string();
        if title.is_empty() || username.is_empty() {
            return Err(LockboxError::Validation(
                "Title and username are required.".to_string(),
            ));
        }
        if let Some(password) = &update.password {
            if password.trim().is_empty() {
                return Err(LockboxError::Validation(
                    "Password cannot be blank.".to_string(),
                ));
            }
        }

        let token = update
            .password
            .as_deref()
            .map(|p| self.cipher.encrypt(p))
            .transpose()?;
        let now = Utc::now().timestamp();

        let mut sets: Vec<String> = Vec::new();
        let mut params: Vec<&dyn ToSql> = Vec::new();

        params.push(&title);
        sets.push(format!("title = ?{}", params.len()));
        params.push(&username);
        sets.push(format!("username = ?{}", params.len()));
        params.push(&update.url);
        sets.push(format!("url = ?{}", params.len()));
        params.push(&update.notes);
        sets.push(format!("notes = ?{}", params.len()));
        if let Some(token) = &token {
            params.push(token);
            sets.push(format!("password_encrypted = ?{}", params.len()));
        }
        if self.caps.entries_timestamps {
            params.push(&now);
            sets.push(format!("updated_at = ?{}", params.len()));
        }

        params.push(&entry_id);
        let id_pos = params.len();
        params.push(&user_id);
        let user_pos = params.len();
        let sql = format!(
            "UPDATE entries SET {} WHERE id = ?{} AND user_id = ?{}",
            sets.join(", "),
            id_pos,
            user_pos
        );

        let db = self.db()?;
        let rows = db.conn().execute(&sql, params.as_slice())?;
        if rows == 0 {
            return Err(LockboxError::NotFound(format!("entry {}", entry_id)));
        }
        Ok(())
    }

    /// Delete an entry owned by the given user.
    ///
    /// Returns whether a row was deleted; deleting a missing or
    /// foreign entry is the normal `false` outcome, not an error.
    pub fn delete_entry(&self, entry_id: i64, user_id: i64) -> Result<bool> {
        let db = self.db()?;
        let rows = db.conn().execute(
            "DELETE FROM entries WHERE id = ?1 AND user_id = ?2",
            (entry_id, user_id),
        )?;
        Ok(rows > 0)
    }

    fn row_to_entry(&self, row: &Row<'_>) -> rusqlite::Result<Entry> {
        let caps = self.caps;
        let id: i64 = row.get("id")?;
        let token: String = row.get("password_encrypted")?;

        let password = match self.cipher.decrypt(&token) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                warn!(entry_id = id, "stored password token failed to decrypt");
                DECRYPT_ERROR_PLACEHOLDER.to_string()
            }
        };

        Ok(Entry {
            id,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            username: row.get("username")?,
            password,
            url: row.get("url")?,
            notes: row.get("notes")?,
            folder_id: if caps.entries_folder_id {
                row.get("folder_id")?
            } else {
                None
            },
            folder_name: if caps.entries_folder_id && caps.folders_table {
                row.get("folder_name")?
            } else {
                None
            },
            created_at: if caps.entries_timestamps {
                row.get::<_, Option<i64>>("created_at")?
                    .and_then(|t| DateTime::from_timestamp(t, 0))
            } else {
                None
            },
            updated_at: if caps.entries_timestamps {
                row.get::<_, Option<i64>>("updated_at")?
                    .and_then(|t| DateTime::from_timestamp(t, 0))
            } else {
                None
            },
        })
    }
}

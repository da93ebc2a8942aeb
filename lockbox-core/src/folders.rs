//! Per-user folders for organizing credential entries.

use crate::db::{duplicate_kind, Database, SchemaCaps};
use crate::{LockboxError, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Folders seeded for a user's first visit: name, color, icon
pub const DEFAULT_FOLDERS: [(&str, &str, &str); 4] = [
    ("Personal", "#10b981", "user"),
    ("Work", "#3b82f6", "briefcase"),
    ("Financial", "#f59e0b", "credit-card"),
    ("Social Media", "#8b5cf6", "share-2"),
];

/// Palette user-created folders draw their color from
const FOLDER_COLORS: [&str; 8] = [
    "#ef4444", "#f59e0b", "#10b981", "#3b82f6", "#8b5cf6", "#ec4899", "#14b8a6", "#64748b",
];

const DEFAULT_ICON: &str = "folder";

/// A named, colored container for a user's entries
#[derive(Debug, Clone)]
pub struct Folder {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A folder annotated with how many entries it holds
#[derive(Debug, Clone)]
pub struct FolderSummary {
    pub folder: Folder,
    pub entry_count: i64,
}

/// Store for per-user folders.
///
/// Every operation is scoped by the owning user id. On schemas that
/// predate the folders migration the operations fail with a normal
/// [`LockboxError::SchemaUnsupported`] outcome.
pub struct FolderRegistry {
    db: Arc<Mutex<Database>>,
    caps: SchemaCaps,
}

impl FolderRegistry {
    pub fn new(db: Arc<Mutex<Database>>, caps: SchemaCaps) -> Self {
        Self { db, caps }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| LockboxError::LockPoisoned)
    }

    fn require_folders(&self) -> Result<()> {
        if self.caps.folders_table {
            Ok(())
        } else {
            Err(LockboxError::SchemaUnsupported("folders"))
        }
    }

    /// List a user's folders, name ascending, with entry counts
    pub fn list_folders(&self, user_id: i64) -> Result<Vec<FolderSummary>> {
        self.require_folders()?;
        let db = self.db()?;

        let mut stmt = db.conn().prepare(
            "SELECT f.id, f.user_id, f.name, f.color, f.icon, f.created_at,
                    (SELECT COUNT(*) FROM entries e WHERE e.folder_id = f.id) AS entry_count
             FROM folders f
             WHERE f.user_id = ?1
             ORDER BY f.name ASC",
        )?;

        let folders = stmt
            .query_map([user_id], |row| {
                Ok(FolderSummary {
                    folder: Folder {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        name: row.get(2)?,
                        color: row.get(3)?,
                        icon: row.get(4)?,
                        created_at: row
                            .get::<_, Option<i64>>(5)?
                            .and_then(|t| DateTime::from_timestamp(t, 0)),
                    },
                    entry_count: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(folders)
    }

    /// Seed the default folder set for a user who has none yet.
    ///
    /// The emptiness check is advisory only; correctness under
    /// concurrent calls rests on the `(user_id, name)` uniqueness
    /// constraint, with duplicate violations swallowed by
    /// `INSERT OR IGNORE`. The whole seed commits as one transaction.
    pub fn ensure_default_folders(&self, user_id: i64) -> Result<()> {
        self.require_folders()?;
        let db = self.db()?;

        let existing: i64 = db.conn().query_row(
            "SELECT COUNT(*) FROM folders WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(());
        }

        let tx = db.conn().unchecked_transaction()?;
        let now = Utc::now().timestamp();
        for (name, color, icon) in DEFAULT_FOLDERS {
            tx.execute(
                "INSERT OR IGNORE INTO folders (user_id, name, color, icon, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (user_id, name, color, icon, now),
            )?;
        }
        tx.commit()?;

        info!(user_id, "seeded default folders");
        Ok(())
    }

    /// Create a folder with a palette color and the generic icon.
    ///
    /// The name is trimmed; a collision with an existing folder of the
    /// same user surfaces as a duplicate conflict derived from the
    /// uniqueness constraint.
    pub fn create_folder(&self, user_id: i64, name: &str) -> Result<Folder> {
        self.require_folders()?;

        let name = name.trim();
        if name.is_empty() {
            return Err(LockboxError::Validation(
                "Folder name is required.".to_string(),
            ));
        }

        let color = *FOLDER_COLORS
            .choose(&mut rand::thread_rng())
            .expect("palette is non-empty");
        let now = Utc::now().timestamp();

        let db = self.db()?;
        db.conn()
            .execute(
                "INSERT INTO folders (user_id, name, color, icon, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (user_id, name, color, DEFAULT_ICON, now),
            )
            .map_err(|e| match duplicate_kind(&e) {
                Some(kind) => LockboxError::Duplicate(kind),
                None => LockboxError::Storage(e),
            })?;

        let id = db.conn().last_insert_rowid();
        Ok(Folder {
            id,
            user_id,
            name: name.to_string(),
            color: color.to_string(),
            icon: DEFAULT_ICON.to_string(),
            created_at: DateTime::from_timestamp(now, 0),
        })
    }
}

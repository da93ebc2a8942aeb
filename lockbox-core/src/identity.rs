//! User accounts: registration, lookup, and credential verification.

use crate::crypto::hash::{hash_password, verify_password};
use crate::db::{duplicate_kind, Database, SchemaCaps};
use crate::validate::{check_password_strength, is_valid_email};
use crate::{LockboxError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, ToSql};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// A registered user account
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Store for user accounts.
///
/// Holds the schema capability snapshot resolved at construction, so
/// the same store runs against pre- and post-migration databases.
pub struct IdentityStore {
    db: Arc<Mutex<Database>>,
    caps: SchemaCaps,
}

impl IdentityStore {
    pub fn new(db: Arc<Mutex<Database>>, caps: SchemaCaps) -> Self {
        Self { db, caps }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| LockboxError::LockPoisoned)
    }

    /// Register a new account and return its id.
    ///
    /// Validates the password strength gate and email syntax, stores
    /// only an Argon2id hash, and derives duplicate conflicts from the
    /// uniqueness constraints instead of pre-checking. On schemas
    /// without the email column the email is not persisted.
    pub fn register(&self, username: &str, email: Option<&str>, password: &str) -> Result<i64> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LockboxError::Validation(
                "Username is required.".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(LockboxError::Validation(
                "Password is required.".to_string(),
            ));
        }
        check_password_strength(password)?;

        let email: Option<String> = match email.map(str::trim) {
            Some("") | None => None,
            Some(e) => {
                if !is_valid_email(e) {
                    return Err(LockboxError::Validation(
                        "Please enter a valid email address.".to_string(),
                    ));
                }
                Some(e.to_string())
            }
        };

        let password_hash = hash_password(password)?;
        let now = Utc::now().timestamp();

        let mut columns: Vec<&str> = vec!["username", "password_hash"];
        let mut params: Vec<&dyn ToSql> = vec![&username, &password_hash];
        if self.caps.users_email {
            columns.push("email");
            params.push(&email);
        }
        if self.caps.users_timestamps {
            columns.push("created_at");
            params.push(&now);
        }
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO users ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let db = self.db()?;
        db.conn()
            .execute(&sql, params.as_slice())
            .map_err(|e| match duplicate_kind(&e) {
                Some(kind) => LockboxError::Duplicate(kind),
                None => LockboxError::Storage(e),
            })?;

        let user_id = db.conn().last_insert_rowid();
        info!(user_id, username, "registered user");
        Ok(user_id)
    }

    /// Verify credentials and return the account.
    ///
    /// The identifier may be a username or an email: identifiers
    /// containing `@` try the email column first, others the username
    /// column first, falling back to the other on a miss. Every
    /// failure shape collapses to the same [`LockboxError::Auth`] so
    /// callers cannot enumerate accounts.
    pub fn authenticate(&self, identifier: &str, password: &str) -> Result<User> {
        let identifier = identifier.trim();

        let db = self.db()?;
        let user = if identifier.contains('@') {
            match self.find_by_email(&db, identifier)? {
                Some(u) => Some(u),
                None => self.find_by_username(&db, identifier)?,
            }
        } else {
            match self.find_by_username(&db, identifier)? {
                Some(u) => Some(u),
                None => self.find_by_email(&db, identifier)?,
            }
        };

        let Some(user) = user else {
            return Err(LockboxError::Auth);
        };
        if !verify_password(password, &user.password_hash) {
            return Err(LockboxError::Auth);
        }

        if self.caps.users_timestamps {
            db.conn().execute(
                "UPDATE users SET last_login = ?1 WHERE id = ?2",
                (Utc::now().timestamp(), user.id),
            )?;
        }

        info!(user_id = user.id, "authenticated user");
        Ok(user)
    }

    /// Look up an account by id, for session resolution
    pub fn user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let db = self.db()?;
        let caps = self.caps;
        db.conn()
            .query_row("SELECT * FROM users WHERE id = ?1", [user_id], |row| {
                Self::row_to_user(row, caps)
            })
            .optional()
            .map_err(LockboxError::from)
    }

    fn find_by_username(&self, db: &Database, username: &str) -> Result<Option<User>> {
        let caps = self.caps;
        db.conn()
            .query_row(
                "SELECT * FROM users WHERE username = ?1",
                [username],
                |row| Self::row_to_user(row, caps),
            )
            .optional()
            .map_err(LockboxError::from)
    }

    fn find_by_email(&self, db: &Database, email: &str) -> Result<Option<User>> {
        // Legacy schemas have no email column to look in
        if !self.caps.users_email {
            return Ok(None);
        }
        let caps = self.caps;
        db.conn()
            .query_row("SELECT * FROM users WHERE email = ?1", [email], |row| {
                Self::row_to_user(row, caps)
            })
            .optional()
            .map_err(LockboxError::from)
    }

    fn row_to_user(row: &Row<'_>, caps: SchemaCaps) -> rusqlite::Result<User> {
        let created_at = if caps.users_timestamps {
            row.get::<_, Option<i64>>("created_at")?
                .and_then(|t| DateTime::from_timestamp(t, 0))
        } else {
            None
        };
        let last_login = if caps.users_timestamps {
            row.get::<_, Option<i64>>("last_login")?
                .and_then(|t| DateTime::from_timestamp(t, 0))
        } else {
            None
        };

        Ok(User {
            id: row.get("id")?,
            username: row.get("username")?,
            email: if caps.users_email {
                row.get("email")?
            } else {
                None
            },
            password_hash: row.get("password_hash")?,
            created_at,
            last_login,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DuplicateKind;

    fn store() -> IdentityStore {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();
        let caps = SchemaCaps::detect(db.conn()).unwrap();
        IdentityStore::new(Arc::new(Mutex::new(db)), caps)
    }

    fn legacy_store() -> IdentityStore {
        let db = Database::in_memory().unwrap();
        db.initialize_legacy_schema().unwrap();
        let caps = SchemaCaps::detect(db.conn()).unwrap();
        IdentityStore::new(Arc::new(Mutex::new(db)), caps)
    }

    #[test]
    fn test_register_and_authenticate() {
        let store = store();
        let id = store
            .register("alice", Some("alice@example.com"), "Str0ng!Pass")
            .unwrap();
        assert!(id > 0);

        let by_name = store.authenticate("alice", "Str0ng!Pass").unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.email.as_deref(), Some("alice@example.com"));

        // Email works as the identifier too
        let by_email = store
            .authenticate("alice@example.com", "Str0ng!Pass")
            .unwrap();
        assert_eq!(by_email.id, id);
    }

    #[test]
    fn test_authenticate_failures_are_uniform() {
        let store = store();
        store.register("alice", None, "Str0ng!Pass").unwrap();

        let wrong_password = store.authenticate("alice", "WrongPass1!").unwrap_err();
        let unknown_user = store.authenticate("nobody", "Str0ng!Pass").unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(wrong_password, LockboxError::Auth));
        assert!(matches!(unknown_user, LockboxError::Auth));
    }

    #[test]
    fn test_duplicate_username() {
        let store = store();
        store.register("alice", None, "Str0ng!Pass").unwrap();

        let err = store.register("alice", None, "Other1Pass!").unwrap_err();
        assert!(matches!(
            err,
            LockboxError::Duplicate(DuplicateKind::Username)
        ));
    }

    #[test]
    fn test_duplicate_email() {
        let store = store();
        store
            .register("alice", Some("a@example.com"), "Str0ng!Pass")
            .unwrap();

        let err = store
            .register("bob", Some("a@example.com"), "Other1Pass!")
            .unwrap_err();
        assert!(matches!(err, LockboxError::Duplicate(DuplicateKind::Email)));
    }

    #[test]
    fn test_weak_passwords_rejected() {
        let store = store();
        for weak in [
            "abc",
            "alllowercase1!",
            "ALLUPPERCASE1!",
            "NoDigitsHere!",
            "NoSymbols123",
        ] {
            assert!(matches!(
                store.register("alice", None, weak),
                Err(LockboxError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let store = store();
        assert!(store.register("", None, "Str0ng!Pass").is_err());
        assert!(store.register("   ", None, "Str0ng!Pass").is_err());
        assert!(store.register("alice", None, "").is_err());
    }

    #[test]
    fn test_bad_email_syntax_rejected() {
        let store = store();
        assert!(matches!(
            store.register("alice", Some("not-an-email"), "Str0ng!Pass"),
            Err(LockboxError::Validation(_))
        ));
    }

    #[test]
    fn test_last_login_stamped() {
        let store = store();
        let id = store.register("alice", None, "Str0ng!Pass").unwrap();

        assert!(store.user_by_id(id).unwrap().unwrap().last_login.is_none());
        store.authenticate("alice", "Str0ng!Pass").unwrap();
        assert!(store.user_by_id(id).unwrap().unwrap().last_login.is_some());
    }

    #[test]
    fn test_legacy_schema_register_and_login() {
        let store = legacy_store();

        // Email is accepted but cannot be persisted without the column
        let id = store
            .register("alice", Some("alice@example.com"), "Str0ng!Pass")
            .unwrap();

        let user = store.authenticate("alice", "Str0ng!Pass").unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, None);
        assert_eq!(user.created_at, None);

        // An email identifier falls back to the username column
        // instead of erroring on the missing email column
        assert!(matches!(
            store.authenticate("alice@example.com", "Str0ng!Pass"),
            Err(LockboxError::Auth)
        ));
    }
}

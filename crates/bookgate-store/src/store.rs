// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Entity store — durable SQLite storage for users, catalog entries, and
// download credentials.
//
// The store owns every entity. Nothing above it caches rows: each call
// re-queries and hands back an owned snapshot.
//
// A single connection sits behind a `Mutex` so one `EntityStore` can be
// shared across threads. Separate processes (or separate `EntityStore`s on
// the same file) are serialised by SQLite itself; every multi-statement
// write runs in an IMMEDIATE transaction and the busy timeout makes
// competing writers wait instead of failing.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use bookgate_core::error::{BookgateError, Result};
use bookgate_core::types::{
    CatalogEntry, CredentialId, CredentialListing, DownloadCredential, EntryId, EntryUpdate,
    NewEntry, Role, User, UserId,
};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info, instrument};

use crate::schema::{CREATE_TABLES_SQL, PRAGMAS_SQL};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn db_err(context: &str) -> impl FnOnce(rusqlite::Error) -> BookgateError + '_ {
    move |e| BookgateError::Database(format!("{context}: {e}"))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// A user about to be inserted. The password is already hashed.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// What the identity service needs to check a login.
#[derive(Clone)]
pub struct LoginRecord {
    pub user_id: UserId,
    pub role: Role,
    pub password_hash: String,
}

/// Result of a conditional credential delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    /// The credential matched a live entry and has been removed.
    Consumed { document_locator: Option<String> },
    /// Nothing matched; no row was touched.
    Rejected,
}

/// SQLite-backed storage for all Bookgate entities.
pub struct EntityStore {
    conn: Mutex<Connection>,
}

impl EntityStore {
    /// Open (or create) the store at `path`.
    ///
    /// Enables WAL, foreign keys, and a busy timeout, then creates any
    /// missing tables.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err("open"))?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(db_err("busy timeout"))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err("WAL pragma"))?;

        let store = Self::init(conn)?;
        info!("entity store opened");
        Ok(store)
    }

    /// Open an in-memory store (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err("open in-memory"))?;
        let store = Self::init(conn)?;
        debug!("in-memory entity store opened");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(PRAGMAS_SQL).map_err(db_err("pragmas"))?;
        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(db_err("create tables"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BookgateError::Database("store connection lock poisoned".into()))
    }

    // -- Users ---------------------------------------------------------------

    /// Insert a user. A second user with the same email is rejected with
    /// `DuplicateEmail` by the UNIQUE constraint.
    #[instrument(skip(self, user), fields(role = %user.role))]
    pub fn insert_user(&self, user: &NewUser) -> Result<UserId> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (name, email, password, role) VALUES (?1, ?2, ?3, ?4)",
            params![user.name, user.email, user.password_hash, user.role.as_str()],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                BookgateError::DuplicateEmail
            } else {
                BookgateError::Database(format!("insert user: {e}"))
            }
        })?;

        let id = UserId(conn.last_insert_rowid());
        debug!(user_id = %id, "user row inserted");
        Ok(id)
    }

    /// Look up a user by exact (case-sensitive) email.
    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn()?
            .query_row(
                "SELECT id, name, email, role FROM users WHERE email = ?1",
                params![email],
                row_to_user,
            )
            .optional()
            .map_err(db_err("user by email"))
    }

    pub fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.conn()?
            .query_row(
                "SELECT id, name, email, role FROM users WHERE id = ?1",
                params![id.0],
                row_to_user,
            )
            .optional()
            .map_err(db_err("user by id"))
    }

    /// Stored hash and role for `email`, if registered.
    pub fn login_record(&self, email: &str) -> Result<Option<LoginRecord>> {
        self.conn()?
            .query_row(
                "SELECT id, role, password FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(LoginRecord {
                        user_id: UserId(row.get(0)?),
                        role: parse_role(row, 1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(db_err("login record"))
    }

    pub fn user_count(&self) -> Result<u64> {
        self.conn()?
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(db_err("count users"))
    }

    // -- Catalog entries -----------------------------------------------------

    #[instrument(skip(self, entry))]
    pub fn insert_entry(&self, entry: &NewEntry) -> Result<EntryId> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO books (title, author, description, image_path, pdf_path)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.title,
                entry.author,
                entry.description,
                entry.cover_locator,
                entry.document_locator,
            ],
        )
        .map_err(db_err("insert entry"))?;

        let id = EntryId(conn.last_insert_rowid());
        debug!(entry_id = %id, "entry row inserted");
        Ok(id)
    }

    pub fn entry(&self, id: EntryId) -> Result<Option<CatalogEntry>> {
        self.conn()?
            .query_row(
                "SELECT id, title, author, description, image_path, pdf_path
                 FROM books WHERE id = ?1",
                params![id.0],
                row_to_entry,
            )
            .optional()
            .map_err(db_err("get entry"))
    }

    /// Every entry, ordered by id.
    #[instrument(skip(self))]
    pub fn entries(&self) -> Result<Vec<CatalogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, author, description, image_path, pdf_path
                 FROM books ORDER BY id ASC",
            )
            .map_err(db_err("prepare entries"))?;

        let entries = stmt
            .query_map([], row_to_entry)
            .map_err(db_err("query entries"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err("collect entries"))?;

        debug!(count = entries.len(), "retrieved entries");
        Ok(entries)
    }

    /// Overwrite title/author/description; replace each locator only when the
    /// update carries a non-empty one. Returns whether the entry existed.
    #[instrument(skip(self, update), fields(entry_id = %update.id))]
    pub fn update_entry(&self, update: &EntryUpdate) -> Result<bool> {
        let rows = self
            .conn()?
            .execute(
                "UPDATE books SET
                    title = ?1,
                    author = ?2,
                    description = ?3,
                    image_path = COALESCE(?4, image_path),
                    pdf_path = COALESCE(?5, pdf_path)
                 WHERE id = ?6",
                params![
                    update.title,
                    update.author,
                    update.description,
                    update.cover_replacement(),
                    update.document_replacement(),
                    update.id.0,
                ],
            )
            .map_err(db_err("update entry"))?;

        debug!(rows, "entry update applied");
        Ok(rows > 0)
    }

    /// Delete an entry and, before it, every credential that references it.
    ///
    /// Both deletes share one transaction, credentials first, so no
    /// credential can outlive its entry.
    #[instrument(skip(self))]
    pub fn delete_entry(&self, id: EntryId) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err("begin delete entry"))?;

        let keys = tx
            .execute("DELETE FROM download_keys WHERE book_id = ?1", params![id.0])
            .map_err(db_err("delete entry credentials"))?;
        let rows = tx
            .execute("DELETE FROM books WHERE id = ?1", params![id.0])
            .map_err(db_err("delete entry"))?;

        tx.commit().map_err(db_err("commit delete entry"))?;

        info!(entry_id = %id, credentials_removed = keys, existed = rows > 0, "entry deleted");
        Ok(rows > 0)
    }

    // -- Download credentials ------------------------------------------------

    /// Insert a credential for an existing entry.
    ///
    /// The existence check and the insert share one transaction, so the
    /// entry cannot vanish in between. Errors: `NotFound` for a missing
    /// entry, `DuplicateValue` if the value exists anywhere in the store.
    #[instrument(skip(self, value))]
    pub fn insert_credential(&self, entry_id: EntryId, value: &str) -> Result<CredentialId> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err("begin insert credential"))?;

        let entry_exists: bool = tx
            .query_row(
                "SELECT EXISTS (SELECT 1 FROM books WHERE id = ?1)",
                params![entry_id.0],
                |row| row.get(0),
            )
            .map_err(db_err("check entry"))?;
        if !entry_exists {
            return Err(BookgateError::NotFound(entry_id));
        }

        tx.execute(
            "INSERT INTO download_keys (book_id, key_value) VALUES (?1, ?2)",
            params![entry_id.0, value],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                BookgateError::DuplicateValue
            } else {
                BookgateError::Database(format!("insert credential: {e}"))
            }
        })?;
        let id = CredentialId(tx.last_insert_rowid());

        tx.commit().map_err(db_err("commit insert credential"))?;
        debug!(credential_id = %id, "credential row inserted");
        Ok(id)
    }

    /// Every credential with its entry's title, ordered by credential id.
    pub fn credential_listings(&self) -> Result<Vec<CredentialListing>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT k.id, k.book_id, k.key_value, b.title
                 FROM download_keys k
                 JOIN books b ON k.book_id = b.id
                 ORDER BY k.id ASC",
            )
            .map_err(db_err("prepare credential listings"))?;

        let listings = stmt
            .query_map([], |row| {
                Ok(CredentialListing {
                    id: CredentialId(row.get(0)?),
                    entry_id: EntryId(row.get(1)?),
                    value: row.get(2)?,
                    entry_title: row.get(3)?,
                })
            })
            .map_err(db_err("query credential listings"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err("collect credential listings"))?;
        Ok(listings)
    }

    pub fn credentials_for_entry(&self, entry_id: EntryId) -> Result<Vec<DownloadCredential>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, book_id, key_value FROM download_keys
                 WHERE book_id = ?1 ORDER BY id ASC",
            )
            .map_err(db_err("prepare credentials for entry"))?;

        let credentials = stmt
            .query_map(params![entry_id.0], |row| {
                Ok(DownloadCredential {
                    id: CredentialId(row.get(0)?),
                    entry_id: EntryId(row.get(1)?),
                    value: row.get(2)?,
                })
            })
            .map_err(db_err("query credentials for entry"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err("collect credentials for entry"))?;
        Ok(credentials)
    }

    /// Whether `(value, entry_id)` names a credential whose entry is live.
    pub fn credential_exists(&self, value: &str, entry_id: EntryId) -> Result<bool> {
        self.conn()?
            .query_row(
                "SELECT EXISTS (
                    SELECT 1 FROM download_keys k
                    JOIN books b ON b.id = k.book_id
                    WHERE k.key_value = ?1 AND k.book_id = ?2
                 )",
                params![value, entry_id.0],
                |row| row.get(0),
            )
            .map_err(db_err("credential exists"))
    }

    /// Atomically validate and delete a credential.
    ///
    /// The delete is conditional on the value, the entry id, and the entry
    /// still existing; only a caller whose delete removed the row gets
    /// `Consumed`. Of any number of racing callers, at most one succeeds.
    #[instrument(skip(self, value))]
    pub fn consume_credential(&self, value: &str, entry_id: EntryId) -> Result<Redemption> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err("begin redeem"))?;

        let removed = tx
            .execute(
                "DELETE FROM download_keys
                 WHERE key_value = ?1
                   AND book_id = ?2
                   AND EXISTS (SELECT 1 FROM books WHERE id = ?2)",
                params![value, entry_id.0],
            )
            .map_err(db_err("conditional delete credential"))?;

        if removed == 0 {
            // Dropping the transaction rolls it back; nothing was written.
            return Ok(Redemption::Rejected);
        }

        let document_locator: Option<String> = tx
            .query_row(
                "SELECT pdf_path FROM books WHERE id = ?1",
                params![entry_id.0],
                |row| row.get(0),
            )
            .map_err(db_err("read document locator"))?;

        tx.commit().map_err(db_err("commit redeem"))?;
        Ok(Redemption::Consumed { document_locator })
    }

    /// Delete a credential by value regardless of entry. Returns whether it existed.
    #[instrument(skip(self, value))]
    pub fn delete_credential(&self, value: &str) -> Result<bool> {
        let rows = self
            .conn()?
            .execute("DELETE FROM download_keys WHERE key_value = ?1", params![value])
            .map_err(db_err("delete credential"))?;
        Ok(rows > 0)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse_role(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Role> {
    let raw: String = row.get(idx)?;
    raw.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        role: parse_role(row, 3)?,
    })
}

/// Column order must match the SELECTs above.
fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogEntry> {
    Ok(CatalogEntry {
        id: EntryId(row.get(0)?),
        title: row.get(1)?,
        author: row.get(2)?,
        description: row.get(3)?,
        cover_locator: row.get(4)?,
        document_locator: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EntityStore {
        EntityStore::open_in_memory().expect("open in-memory store")
    }

    fn user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: "Test".into(),
            email: email.into(),
            password_hash: "pbkdf2-sha256$1$00$00".into(),
            role,
        }
    }

    fn book(store: &EntityStore) -> EntryId {
        store
            .insert_entry(
                &NewEntry::new("Dune", "Frank Herbert", "Spice.")
                    .with_cover("covers/dune.jpg")
                    .with_document("books/dune.pdf"),
            )
            .expect("insert entry")
    }

    #[test]
    fn duplicate_email_rejected_by_constraint() {
        let store = store();
        store.insert_user(&user("a@b.c", Role::Member)).unwrap();
        assert!(matches!(
            store.insert_user(&user("a@b.c", Role::Librarian)),
            Err(BookgateError::DuplicateEmail)
        ));
        // Email comparison is case-sensitive.
        store.insert_user(&user("A@b.c", Role::Member)).unwrap();
        assert_eq!(store.user_count().unwrap(), 2);
    }

    #[test]
    fn users_round_trip_with_role() {
        let store = store();
        let id = store.insert_user(&user("lib@b.c", Role::Librarian)).unwrap();

        let by_email = store.user_by_email("lib@b.c").unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.role, Role::Librarian);
        assert_eq!(store.user_by_id(id).unwrap(), Some(by_email));

        let record = store.login_record("lib@b.c").unwrap().unwrap();
        assert_eq!(record.user_id, id);
        assert!(store.login_record("nobody@b.c").unwrap().is_none());
    }

    #[test]
    fn update_preserves_locators_when_blank() {
        let store = store();
        let id = book(&store);

        let update = EntryUpdate::new(id, "Dune (2nd ed.)", "Frank Herbert", "More spice.")
            .with_cover("");
        assert!(store.update_entry(&update).unwrap());

        let entry = store.entry(id).unwrap().unwrap();
        assert_eq!(entry.title, "Dune (2nd ed.)");
        assert_eq!(entry.cover_locator.as_deref(), Some("covers/dune.jpg"));
        assert_eq!(entry.document_locator.as_deref(), Some("books/dune.pdf"));

        let update = EntryUpdate::new(id, "Dune", "Frank Herbert", "Spice.")
            .with_document("books/dune-v2.pdf");
        store.update_entry(&update).unwrap();
        let entry = store.entry(id).unwrap().unwrap();
        assert_eq!(entry.document_locator.as_deref(), Some("books/dune-v2.pdf"));
    }

    #[test]
    fn update_missing_entry_reports_false() {
        let store = store();
        let update = EntryUpdate::new(EntryId(99), "t", "a", "d");
        assert!(!store.update_entry(&update).unwrap());
    }

    #[test]
    fn delete_entry_removes_its_credentials_first() {
        let store = store();
        let id = book(&store);
        let other = book(&store);
        store.insert_credential(id, "K1").unwrap();
        store.insert_credential(id, "K2").unwrap();
        store.insert_credential(other, "K3").unwrap();

        assert!(store.delete_entry(id).unwrap());
        assert!(store.entry(id).unwrap().is_none());
        assert!(store.credentials_for_entry(id).unwrap().is_empty());

        let remaining = store.credential_listings().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].value, "K3");

        assert!(!store.delete_entry(id).unwrap());
    }

    #[test]
    fn credential_values_are_globally_unique() {
        let store = store();
        let a = book(&store);
        let b = book(&store);
        store.insert_credential(a, "K1").unwrap();
        assert!(matches!(
            store.insert_credential(b, "K1"),
            Err(BookgateError::DuplicateValue)
        ));
    }

    #[test]
    fn credential_for_missing_entry_is_not_found() {
        let store = store();
        assert!(matches!(
            store.insert_credential(EntryId(42), "K1"),
            Err(BookgateError::NotFound(EntryId(42)))
        ));
        assert!(store.credential_listings().unwrap().is_empty());
    }

    #[test]
    fn listings_join_entry_title() {
        let store = store();
        let id = book(&store);
        store.insert_credential(id, "K1").unwrap();

        let listings = store.credential_listings().unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].entry_title, "Dune");
        assert_eq!(listings[0].entry_id, id);
    }

    #[test]
    fn consume_is_single_use_and_scoped() {
        let store = store();
        let id = book(&store);
        let other = book(&store);
        store.insert_credential(id, "K1").unwrap();

        assert!(store.credential_exists("K1", id).unwrap());
        assert!(!store.credential_exists("K1", other).unwrap());
        assert_eq!(store.consume_credential("K1", other).unwrap(), Redemption::Rejected);

        assert_eq!(
            store.consume_credential("K1", id).unwrap(),
            Redemption::Consumed {
                document_locator: Some("books/dune.pdf".into())
            }
        );
        assert_eq!(store.consume_credential("K1", id).unwrap(), Redemption::Rejected);
        assert!(!store.credential_exists("K1", id).unwrap());
    }

    #[test]
    fn delete_credential_by_value() {
        let store = store();
        let id = book(&store);
        store.insert_credential(id, "K1").unwrap();
        assert!(store.delete_credential("K1").unwrap());
        assert!(!store.delete_credential("K1").unwrap());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookgate.db");
        let id = {
            let store = EntityStore::open(&path).unwrap();
            let id = book(&store);
            store.insert_credential(id, "K1").unwrap();
            id
        };
        let store = EntityStore::open(&path).unwrap();
        assert_eq!(store.entry(id).unwrap().unwrap().title, "Dune");
        assert!(store.credential_exists("K1", id).unwrap());
    }
}

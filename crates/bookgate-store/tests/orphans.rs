// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A credential row whose entry is gone must never validate, even when it
// reached the database without the foreign-key check.

use std::sync::Arc;

use bookgate_core::{BookgateError, EntryId};
use bookgate_store::{CredentialGate, EntityStore};
use rusqlite::{Connection, params};

#[test]
fn credential_without_entry_never_validates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookgate.db");

    // Create the schema, then write the dangling row behind the store's back.
    drop(EntityStore::open(&path).unwrap());
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
        conn.execute(
            "INSERT INTO download_keys (book_id, key_value) VALUES (?1, ?2)",
            params![7_i64, "ORPH"],
        )
        .unwrap();
    }

    let store = Arc::new(EntityStore::open(&path).unwrap());
    let missing = EntryId(7);
    assert!(store.entry(missing).unwrap().is_none());
    assert!(!store.credential_exists("ORPH", missing).unwrap());
    assert!(store.credential_listings().unwrap().is_empty());

    let gate = CredentialGate::new(Arc::clone(&store));
    assert!(matches!(
        gate.redeem("ORPH", missing),
        Err(BookgateError::InvalidCredential)
    ));
    // Still rejected on a second attempt; the guarded delete touched nothing.
    assert!(matches!(
        gate.redeem("ORPH", missing),
        Err(BookgateError::InvalidCredential)
    ));
}

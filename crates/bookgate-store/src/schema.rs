// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SQLite schema for the entity store.
//
// Table and column names match existing `bookgate.db` files. `users.password`
// holds a PBKDF2 hash string, never a plaintext password.

/// Connection settings applied before the schema.
pub(crate) const PRAGMAS_SQL: &str = "
    PRAGMA foreign_keys = ON;
";

pub(crate) const CREATE_TABLES_SQL: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        name     TEXT NOT NULL,
        email    TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        role     TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS books (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        title       TEXT NOT NULL,
        author      TEXT NOT NULL,
        description TEXT NOT NULL,
        image_path  TEXT,
        pdf_path    TEXT
    );

    CREATE TABLE IF NOT EXISTS download_keys (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        book_id   INTEGER NOT NULL REFERENCES books(id),
        key_value TEXT NOT NULL UNIQUE
    );

    CREATE INDEX IF NOT EXISTS download_keys_book ON download_keys(book_id);
";

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Catalog manager — create, read, update, and delete catalog entries.

use std::sync::Arc;

use bookgate_core::error::{BookgateError, Result};
use bookgate_core::types::{CatalogEntry, EntryId, EntryUpdate, NewEntry, non_empty};
use tracing::{info, instrument};

use crate::session::LibrarianGrant;
use crate::store::EntityStore;

pub struct CatalogManager {
    store: Arc<EntityStore>,
}

impl CatalogManager {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Publish a new entry. Blank locators are stored as absent.
    #[instrument(skip(self, grant, entry), fields(librarian = %grant.user_id()))]
    pub fn create(&self, grant: &LibrarianGrant, entry: NewEntry) -> Result<EntryId> {
        require_text(&entry.title, &entry.author, &entry.description)?;

        let entry = NewEntry {
            cover_locator: non_empty(entry.cover_locator.as_deref()).map(str::to_owned),
            document_locator: non_empty(entry.document_locator.as_deref()).map(str::to_owned),
            ..entry
        };
        let id = self.store.insert_entry(&entry)?;

        info!(entry_id = %id, "catalog entry created");
        Ok(id)
    }

    pub fn get(&self, id: EntryId) -> Result<CatalogEntry> {
        self.store.entry(id)?.ok_or(BookgateError::NotFound(id))
    }

    /// A fresh snapshot of every entry.
    pub fn list_all(&self) -> Result<Vec<CatalogEntry>> {
        self.store.entries()
    }

    /// Entries whose title or author contains `query`, ignoring case.
    /// A blank query matches everything.
    pub fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        let needle = query.trim().to_lowercase();
        let mut entries = self.store.entries()?;
        if !needle.is_empty() {
            entries.retain(|e| {
                e.title.to_lowercase().contains(&needle) || e.author.to_lowercase().contains(&needle)
            });
        }
        Ok(entries)
    }

    /// Overwrite an entry's text; replace a locator only when a non-empty
    /// one is supplied.
    #[instrument(skip(self, grant, update), fields(librarian = %grant.user_id(), entry_id = %update.id))]
    pub fn update(&self, grant: &LibrarianGrant, update: EntryUpdate) -> Result<()> {
        require_text(&update.title, &update.author, &update.description)?;

        if !self.store.update_entry(&update)? {
            return Err(BookgateError::NotFound(update.id));
        }
        info!("catalog entry updated");
        Ok(())
    }

    /// Remove an entry and every credential for it. Returns whether the entry
    /// existed.
    #[instrument(skip(self, grant), fields(librarian = %grant.user_id()))]
    pub fn delete(&self, grant: &LibrarianGrant, id: EntryId) -> Result<bool> {
        self.store.delete_entry(id)
    }
}

fn require_text(title: &str, author: &str, description: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(BookgateError::MissingField("title"));
    }
    if author.trim().is_empty() {
        return Err(BookgateError::MissingField("author"));
    }
    if description.trim().is_empty() {
        return Err(BookgateError::MissingField("description"));
    }
    Ok(())
}

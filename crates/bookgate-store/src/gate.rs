// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Credential gate — issues single-use download credentials and decides
// whether a caller may retrieve an entry's document.
//
// Librarians bypass redemption. Members must present a credential that
// matches both the value and the entry; a successful redemption deletes
// the credential in the same transaction that validated it.
//
// Credential values never appear in logs; `fingerprint` stands in for them.

use std::sync::Arc;

use bookgate_core::error::{BookgateError, Result};
use bookgate_core::types::{Access, CredentialId, CredentialListing, DownloadCredential, EntryId};
use bookgate_security::{fingerprint, generate_token};
use tracing::{debug, info, instrument, warn};

use crate::session::{LibrarianGrant, Session};
use crate::store::{EntityStore, Redemption};

/// Attempts at drawing a fresh random value before giving up.
const GENERATE_ATTEMPTS: usize = 3;

pub struct CredentialGate {
    store: Arc<EntityStore>,
}

impl CredentialGate {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Issue a credential with a caller-chosen value.
    #[instrument(skip(self, grant, value), fields(librarian = %grant.user_id(), key = %fingerprint(value)))]
    pub fn issue(&self, grant: &LibrarianGrant, entry_id: EntryId, value: &str) -> Result<CredentialId> {
        if value.is_empty() {
            return Err(BookgateError::MissingField("credential value"));
        }
        let id = self.store.insert_credential(entry_id, value)?;
        info!(credential_id = %id, "credential issued");
        Ok(id)
    }

    /// Issue a credential with a random value and return it.
    pub fn issue_generated(
        &self,
        grant: &LibrarianGrant,
        entry_id: EntryId,
    ) -> Result<(CredentialId, String)> {
        let mut attempts = 0;
        loop {
            let value = generate_token()?;
            match self.issue(grant, entry_id, &value) {
                Ok(id) => return Ok((id, value)),
                Err(BookgateError::DuplicateValue) if attempts + 1 < GENERATE_ATTEMPTS => {
                    attempts += 1;
                    debug!(attempts, "generated credential collided, drawing again");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Decide how `session` may retrieve the entry's document.
    #[instrument(skip(self, session), fields(user_id = %session.user_id()))]
    pub fn request_access(&self, entry_id: EntryId, session: &Session) -> Result<Access> {
        let entry = self
            .store
            .entry(entry_id)?
            .ok_or(BookgateError::NotFound(entry_id))?;

        if session.is_librarian() {
            debug!("librarian bypass");
            Ok(Access::Granted {
                document_locator: entry.document_locator,
            })
        } else {
            Ok(Access::RequiresCredential)
        }
    }

    /// Redeem a credential for an entry.
    ///
    /// Unknown, already-redeemed, mismatched, and orphaned credentials all
    /// produce the same `InvalidCredential`.
    #[instrument(skip(self, value), fields(key = %fingerprint(value)))]
    pub fn redeem(&self, value: &str, entry_id: EntryId) -> Result<Access> {
        match self.store.consume_credential(value, entry_id)? {
            Redemption::Consumed { document_locator } => {
                info!("credential redeemed");
                Ok(Access::Granted { document_locator })
            }
            Redemption::Rejected => {
                warn!("credential rejected");
                Err(BookgateError::InvalidCredential)
            }
        }
    }

    /// Every outstanding credential with its entry title.
    pub fn list(&self, _grant: &LibrarianGrant) -> Result<Vec<CredentialListing>> {
        self.store.credential_listings()
    }

    pub fn credentials_for(
        &self,
        _grant: &LibrarianGrant,
        entry_id: EntryId,
    ) -> Result<Vec<DownloadCredential>> {
        self.store.credentials_for_entry(entry_id)
    }

    /// Delete a credential without redeeming it. Returns whether it existed.
    #[instrument(skip(self, grant, value), fields(librarian = %grant.user_id(), key = %fingerprint(value)))]
    pub fn revoke(&self, grant: &LibrarianGrant, value: &str) -> Result<bool> {
        let removed = self.store.delete_credential(value)?;
        if removed {
            info!("credential revoked");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use bookgate_core::types::{NewEntry, Role, UserId};

    use super::*;

    struct Fixture {
        store: Arc<EntityStore>,
        gate: CredentialGate,
        grant: LibrarianGrant,
        librarian: Session,
        member: Session,
        entry: EntryId,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(EntityStore::open_in_memory().unwrap());
        let entry = store
            .insert_entry(&NewEntry::new("Emma", "Jane Austen", "d").with_document("books/emma.pdf"))
            .unwrap();
        let librarian = Session::new(UserId(1), "lib@b.c", Role::Librarian);
        Fixture {
            gate: CredentialGate::new(Arc::clone(&store)),
            grant: librarian.librarian().unwrap(),
            librarian,
            member: Session::new(UserId(2), "mem@b.c", Role::Member),
            store,
            entry,
        }
    }

    #[test]
    fn librarian_bypasses_without_consuming() {
        let f = fixture();
        f.gate.issue(&f.grant, f.entry, "K1").unwrap();

        let access = f.gate.request_access(f.entry, &f.librarian).unwrap();
        assert_eq!(access.document_locator(), Some("books/emma.pdf"));
        assert_eq!(f.gate.list(&f.grant).unwrap().len(), 1);
    }

    #[test]
    fn member_must_redeem() {
        let f = fixture();
        assert_eq!(
            f.gate.request_access(f.entry, &f.member).unwrap(),
            Access::RequiresCredential
        );
        assert!(matches!(
            f.gate.request_access(EntryId(99), &f.member),
            Err(BookgateError::NotFound(EntryId(99)))
        ));
    }

    #[test]
    fn redeem_is_single_use() {
        let f = fixture();
        f.gate.issue(&f.grant, f.entry, "K1").unwrap();

        let access = f.gate.redeem("K1", f.entry).unwrap();
        assert_eq!(access.document_locator(), Some("books/emma.pdf"));
        assert!(matches!(
            f.gate.redeem("K1", f.entry),
            Err(BookgateError::InvalidCredential)
        ));
    }

    #[test]
    fn redeem_requires_matching_entry() {
        let f = fixture();
        let other = f.store.insert_entry(&NewEntry::new("t", "a", "d")).unwrap();
        f.gate.issue(&f.grant, f.entry, "K1").unwrap();

        assert!(matches!(
            f.gate.redeem("K1", other),
            Err(BookgateError::InvalidCredential)
        ));
        // The mismatch did not burn the credential.
        assert!(f.gate.redeem("K1", f.entry).is_ok());
    }

    #[test]
    fn issue_validates_value_and_entry() {
        let f = fixture();
        assert!(matches!(
            f.gate.issue(&f.grant, f.entry, ""),
            Err(BookgateError::MissingField(_))
        ));
        assert!(matches!(
            f.gate.issue(&f.grant, EntryId(99), "K1"),
            Err(BookgateError::NotFound(_))
        ));
        f.gate.issue(&f.grant, f.entry, "K1").unwrap();
        assert!(matches!(
            f.gate.issue(&f.grant, f.entry, "K1"),
            Err(BookgateError::DuplicateValue)
        ));
    }

    #[test]
    fn generated_credentials_are_distinct_and_redeemable() {
        let f = fixture();
        let (_, first) = f.gate.issue_generated(&f.grant, f.entry).unwrap();
        let (_, second) = f.gate.issue_generated(&f.grant, f.entry).unwrap();
        assert_ne!(first, second);
        assert_eq!(f.gate.credentials_for(&f.grant, f.entry).unwrap().len(), 2);
        assert!(f.gate.redeem(&first, f.entry).unwrap().is_granted());
    }

    #[test]
    fn revoked_credential_cannot_be_redeemed() {
        let f = fixture();
        f.gate.issue(&f.grant, f.entry, "K1").unwrap();
        assert!(f.gate.revoke(&f.grant, "K1").unwrap());
        assert!(!f.gate.revoke(&f.grant, "K1").unwrap());
        assert!(matches!(
            f.gate.redeem("K1", f.entry),
            Err(BookgateError::InvalidCredential)
        ));
    }
}

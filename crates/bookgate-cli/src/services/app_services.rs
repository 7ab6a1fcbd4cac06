// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — opens the databases in the data directory, loads
// the configuration, and records every access decision in the audit trail.
//
// Audit subjects never carry secrets: users are `user:<email>`, entries are
// `book:<id>`, and credentials are `key:<fingerprint>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bookgate_core::error::{BookgateError, Result};
use bookgate_core::types::{
    Access, CatalogEntry, CredentialId, CredentialListing, EntryId, EntryUpdate, NewEntry, User,
    UserId,
};
use bookgate_core::AppConfig;
use bookgate_security::audit::{AuditEntry, AuditLog};
use bookgate_security::integrity::fingerprint;
use bookgate_store::{
    CatalogManager, CredentialGate, EntityStore, IdentityService, Registration, Session,
};
use tracing::{error, info};

const CONFIG_FILE: &str = "config.json";
const STORE_FILE: &str = "bookgate.db";
const AUDIT_FILE: &str = "audit.db";

/// Everything a command handler needs, opened once per invocation.
pub struct AppServices {
    identity: IdentityService,
    catalog: CatalogManager,
    gate: CredentialGate,
    audit_log: Option<AuditLog>,
    config: AppConfig,
    data_dir: PathBuf,
}

impl AppServices {
    /// Open the store and audit log under `data_dir` and seed the bootstrap
    /// librarian if configured.
    pub fn init(data_dir: PathBuf) -> Result<Self> {
        info!(path = %data_dir.display(), "initialising app services");

        let config = load_config(&data_dir)?;
        let store = Arc::new(EntityStore::open(data_dir.join(STORE_FILE))?);
        let identity = IdentityService::new(Arc::clone(&store), &config)?;

        let audit_log = if config.audit_enabled {
            Some(AuditLog::open(data_dir.join(AUDIT_FILE))?)
        } else {
            None
        };

        let services = Self {
            identity,
            catalog: CatalogManager::new(Arc::clone(&store)),
            gate: CredentialGate::new(store),
            audit_log,
            config,
            data_dir,
        };

        if let Some(account) = &services.config.bootstrap_librarian {
            if services.identity.ensure_bootstrap_librarian(account)? {
                services.audit("register", &user_subject(&account.email), true, Some("bootstrap librarian"));
            }
        }

        Ok(services)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// Write the active configuration to `config.json` unless the file
    /// already exists. Returns whether it was written.
    pub fn write_config_if_missing(&self) -> Result<bool> {
        if self.config_path().exists() {
            return Ok(false);
        }
        persist_config(&self.data_dir, &self.config)?;
        Ok(true)
    }

    // -- Identity ------------------------------------------------------------

    pub fn register(&self, registration: &Registration) -> Result<UserId> {
        let result = self.identity.register(registration);
        self.audit_result(
            "register",
            &user_subject(&registration.email),
            &result,
            Some(registration.requested_role.as_str()),
        );
        result
    }

    pub fn login(&self, email: &str, password: &str, as_librarian: bool) -> Result<Session> {
        let result = if as_librarian {
            self.identity.login_as_librarian(email, password)
        } else {
            self.identity.login(email, password)
        };
        self.audit_result("login", &user_subject(email), &result, None);
        result
    }

    pub fn user(&self, email: &str) -> Result<User> {
        self.identity.user(email)?.ok_or(BookgateError::UnknownUser)
    }

    // -- Catalog -------------------------------------------------------------

    pub fn books(&self) -> Result<Vec<CatalogEntry>> {
        self.catalog.list_all()
    }

    pub fn search_books(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        self.catalog.search(query)
    }

    pub fn book(&self, id: EntryId) -> Result<CatalogEntry> {
        self.catalog.get(id)
    }

    pub fn add_book(&self, session: &Session, entry: NewEntry) -> Result<EntryId> {
        let grant = session.librarian()?;
        let id = self.catalog.create(&grant, entry)?;
        self.audit("book_create", &book_subject(id), true, None);
        Ok(id)
    }

    pub fn edit_book(&self, session: &Session, update: EntryUpdate) -> Result<()> {
        let grant = session.librarian()?;
        let subject = book_subject(update.id);
        let result = self.catalog.update(&grant, update);
        self.audit_result("book_update", &subject, &result, None);
        result
    }

    pub fn delete_book(&self, session: &Session, id: EntryId) -> Result<bool> {
        let grant = session.librarian()?;
        let existed = self.catalog.delete(&grant, id)?;
        self.audit("book_delete", &book_subject(id), existed, None);
        Ok(existed)
    }

    // -- Download keys -------------------------------------------------------

    /// Outstanding keys, optionally only those for one entry.
    pub fn keys(&self, session: &Session, entry: Option<EntryId>) -> Result<Vec<CredentialListing>> {
        let grant = session.librarian()?;
        let mut listings = self.gate.list(&grant)?;
        if let Some(entry) = entry {
            listings.retain(|l| l.entry_id == entry);
        }
        Ok(listings)
    }

    /// Issue `value`, or a generated value when none is given. Returns the
    /// id and the value so the librarian can pass it on.
    pub fn issue_key(
        &self,
        session: &Session,
        entry: EntryId,
        value: Option<&str>,
    ) -> Result<(CredentialId, String)> {
        let grant = session.librarian()?;
        let issued = match value {
            Some(value) => self
                .gate
                .issue(&grant, entry, value)
                .map(|id| (id, value.to_owned())),
            None => self.gate.issue_generated(&grant, entry),
        };

        let details = format!("book {entry}");
        match &issued {
            Ok((_, value)) => self.audit("key_issue", &key_subject(value), true, Some(&details)),
            Err(e) => self.audit("key_issue", &book_subject(entry), false, Some(&e.to_string())),
        }
        issued
    }

    pub fn revoke_key(&self, session: &Session, value: &str) -> Result<bool> {
        let grant = session.librarian()?;
        let removed = self.gate.revoke(&grant, value)?;
        self.audit("key_revoke", &key_subject(value), removed, None);
        Ok(removed)
    }

    /// Resolve a download: librarians pass straight through, members redeem
    /// `key` if they supplied one.
    pub fn download(&self, session: &Session, entry: EntryId, key: Option<&str>) -> Result<Access> {
        let access = self.gate.request_access(entry, session)?;
        if access.is_granted() {
            self.audit("access_bypass", &book_subject(entry), true, Some(&user_subject(session.email())));
            return Ok(access);
        }

        let Some(key) = key else {
            return Ok(Access::RequiresCredential);
        };
        let result = self.gate.redeem(key, entry);
        let details = format!("book {entry} by {}", user_subject(session.email()));
        self.audit_result("key_redeem", &key_subject(key), &result, Some(&details));
        result
    }

    // -- Audit ---------------------------------------------------------------

    pub fn recent_audit_entries(&self, session: &Session, limit: u32) -> Result<Vec<AuditEntry>> {
        session.librarian()?;
        self.audit_log()?.recent_entries(limit)
    }

    pub fn audit_entries_for_subject(&self, session: &Session, subject: &str) -> Result<Vec<AuditEntry>> {
        session.librarian()?;
        self.audit_log()?.entries_for_subject(subject)
    }

    /// Record an audit entry. Failures are logged, never surfaced.
    pub fn audit(&self, action: &str, subject: &str, success: bool, details: Option<&str>) {
        if let Some(log) = &self.audit_log {
            if let Err(e) = log.record(action, subject, success, details) {
                error!(error = %e, "failed to record audit entry");
            }
        }
    }

    fn audit_result<T>(&self, action: &str, subject: &str, result: &Result<T>, details: Option<&str>) {
        match result {
            Ok(_) => self.audit(action, subject, true, details),
            Err(e) => self.audit(action, subject, false, Some(&e.to_string())),
        }
    }

    fn audit_log(&self) -> Result<&AuditLog> {
        self.audit_log
            .as_ref()
            .ok_or_else(|| BookgateError::Config("audit trail is disabled".into()))
    }
}

pub fn user_subject(email: &str) -> String {
    format!("user:{email}")
}

pub fn book_subject(id: EntryId) -> String {
    format!("book:{id}")
}

pub fn key_subject(value: &str) -> String {
    format!("key:{}", fingerprint(value))
}

// -- Config file persistence -------------------------------------------------

/// Defaults when the file is absent; a file that exists must parse.
fn load_config(data_dir: &Path) -> Result<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let data = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&data)?)
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

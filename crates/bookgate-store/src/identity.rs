// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identity & role service — registration, authentication, and role lookup.
//
// Passwords are stored as salted PBKDF2 hashes. Unknown emails and wrong
// passwords fail identically: an unknown email still pays for one hash
// verification against a throwaway hash.

use std::sync::Arc;

use bookgate_core::config::{AppConfig, BootstrapAccount};
use bookgate_core::error::{BookgateError, Result};
use bookgate_core::types::{Role, User, UserId, UserRef};
use bookgate_security::{PasswordHasher, secrets_match};
use tracing::{debug, info, instrument, warn};

use crate::session::Session;
use crate::store::{EntityStore, NewUser};

/// A registration request.
#[derive(Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub requested_role: Role,
    /// Required when `requested_role` is `Librarian`.
    pub admission_key: Option<String>,
}

impl Registration {
    pub fn member(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            requested_role: Role::Member,
            admission_key: None,
        }
    }

    pub fn librarian(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        admission_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            requested_role: Role::Librarian,
            admission_key: Some(admission_key.into()),
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("requested_role", &self.requested_role)
            .field("admission_key", &self.admission_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Authenticates users and answers role questions.
pub struct IdentityService {
    store: Arc<EntityStore>,
    hasher: PasswordHasher,
    admission_key: String,
    min_password_len: usize,
    dummy_hash: String,
}

impl IdentityService {
    /// Build the service from validated configuration.
    pub fn new(store: Arc<EntityStore>, config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let hasher = PasswordHasher::new(config.pbkdf2_iterations)?;
        let dummy_hash = hasher.hash("bookgate-unknown-account")?;

        Ok(Self {
            store,
            hasher,
            admission_key: config.admission_key.clone(),
            min_password_len: config.min_password_len,
            dummy_hash,
        })
    }

    /// Create an account.
    ///
    /// Checks run in a fixed order: empty fields, password length, email
    /// already taken, then the admission key for librarian requests. On any
    /// failure nothing is written.
    #[instrument(skip(self, registration), fields(email = %registration.email, role = %registration.requested_role))]
    pub fn register(&self, registration: &Registration) -> Result<UserId> {
        if registration.name.trim().is_empty() {
            return Err(BookgateError::MissingField("name"));
        }
        if registration.email.trim().is_empty() {
            return Err(BookgateError::MissingField("email"));
        }
        if registration.password.is_empty() {
            return Err(BookgateError::MissingField("password"));
        }
        if registration.password.chars().count() < self.min_password_len {
            return Err(BookgateError::WeakPassword {
                min_len: self.min_password_len,
            });
        }
        if self.store.user_by_email(&registration.email)?.is_some() {
            return Err(BookgateError::DuplicateEmail);
        }
        if registration.requested_role == Role::Librarian {
            let key_ok = registration
                .admission_key
                .as_deref()
                .is_some_and(|key| secrets_match(key, &self.admission_key));
            if !key_ok {
                warn!("librarian registration with invalid admission key");
                return Err(BookgateError::InvalidAdmissionKey);
            }
        }

        let password_hash = self.hasher.hash(&registration.password)?;
        let id = self.store.insert_user(&NewUser {
            name: registration.name.clone(),
            email: registration.email.clone(),
            password_hash,
            role: registration.requested_role,
        })?;

        info!(user_id = %id, "user registered");
        Ok(id)
    }

    /// Check an (email, password) pair.
    #[instrument(skip(self, password))]
    pub fn authenticate(&self, email: &str, password: &str) -> Result<UserId> {
        self.check_password(email, password).map(|(id, _)| id)
    }

    /// Authenticate and open a session carrying the user's role.
    #[instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        let (user_id, role) = self.check_password(email, password)?;
        debug!(user_id = %user_id, %role, "session opened");
        Ok(Session::new(user_id, email, role))
    }

    /// Like `login`, but members are turned away with `NotLibrarian`.
    #[instrument(skip(self, password))]
    pub fn login_as_librarian(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.login(email, password)?;
        if !session.is_librarian() {
            warn!("librarian login by a member account");
            return Err(BookgateError::NotLibrarian);
        }
        Ok(session)
    }

    pub fn role_of(&self, user: impl Into<UserRef>) -> Result<Role> {
        let found = match user.into() {
            UserRef::Id(id) => self.store.user_by_id(id)?,
            UserRef::Email(email) => self.store.user_by_email(&email)?,
        };
        found.map(|u| u.role).ok_or(BookgateError::UnknownUser)
    }

    /// False for unknown emails.
    pub fn is_librarian(&self, email: &str) -> Result<bool> {
        Ok(self
            .store
            .user_by_email(email)?
            .is_some_and(|u| u.role.is_librarian()))
    }

    pub fn user(&self, email: &str) -> Result<Option<User>> {
        self.store.user_by_email(email)
    }

    /// Seed a librarian account if its email is not registered yet.
    ///
    /// Returns whether the account was created. The admission key is not
    /// required here; this runs from trusted configuration only.
    #[instrument(skip(self, account), fields(email = %account.email))]
    pub fn ensure_bootstrap_librarian(&self, account: &BootstrapAccount) -> Result<bool> {
        if self.store.user_by_email(&account.email)?.is_some() {
            return Ok(false);
        }

        let password_hash = self.hasher.hash(&account.password)?;
        let inserted = self.store.insert_user(&NewUser {
            name: account.name.clone(),
            email: account.email.clone(),
            password_hash,
            role: Role::Librarian,
        });

        match inserted {
            Ok(id) => {
                info!(user_id = %id, "bootstrap librarian created");
                Ok(true)
            }
            // Another process seeded it first.
            Err(BookgateError::DuplicateEmail) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn check_password(&self, email: &str, password: &str) -> Result<(UserId, Role)> {
        let Some(record) = self.store.login_record(email)? else {
            let _ = self.hasher.verify(password, &self.dummy_hash)?;
            warn!("login for unknown email");
            return Err(BookgateError::InvalidCredentials);
        };

        if self.hasher.verify(password, &record.password_hash)? {
            Ok((record.user_id, record.role))
        } else {
            warn!("login with wrong password");
            Err(BookgateError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> IdentityService {
        let store = Arc::new(EntityStore::open_in_memory().unwrap());
        let config = AppConfig {
            pbkdf2_iterations: 1_000,
            ..Default::default()
        };
        IdentityService::new(store, &config).unwrap()
    }

    #[test]
    fn librarian_registration_needs_the_admission_key() {
        let svc = service();
        let id = svc
            .register(&Registration::librarian("Ada", "ada@b.c", "secret1", "ADMIN2024"))
            .unwrap();
        assert_eq!(svc.role_of(id).unwrap(), Role::Librarian);

        let wrong = Registration::librarian("Bob", "bob@b.c", "secret1", "admin2024");
        assert!(matches!(svc.register(&wrong), Err(BookgateError::InvalidAdmissionKey)));

        let missing = Registration {
            admission_key: None,
            ..wrong
        };
        assert!(matches!(svc.register(&missing), Err(BookgateError::InvalidAdmissionKey)));
        assert!(svc.user("bob@b.c").unwrap().is_none());
    }

    #[test]
    fn member_registration_ignores_the_key() {
        let svc = service();
        let mut reg = Registration::member("Cy", "cy@b.c", "secret1");
        reg.admission_key = Some("nonsense".into());
        let id = svc.register(&reg).unwrap();
        assert_eq!(svc.role_of(id).unwrap(), Role::Member);
    }

    #[test]
    fn registration_errors_follow_a_fixed_order() {
        let svc = service();
        svc.register(&Registration::member("Ada", "ada@b.c", "secret1"))
            .unwrap();

        assert!(matches!(
            svc.register(&Registration::member("", "ada@b.c", "x")),
            Err(BookgateError::MissingField("name"))
        ));
        // Short password beats duplicate email.
        assert!(matches!(
            svc.register(&Registration::member("Ada", "ada@b.c", "12345")),
            Err(BookgateError::WeakPassword { min_len: 6 })
        ));
        // Duplicate email beats a bad admission key.
        assert!(matches!(
            svc.register(&Registration::librarian("Ada", "ada@b.c", "secret1", "bad")),
            Err(BookgateError::DuplicateEmail)
        ));
    }

    #[test]
    fn password_length_counts_characters() {
        let svc = service();
        // Ten bytes, five characters.
        assert!(matches!(
            svc.register(&Registration::member("Zoë", "zoe@b.c", "ééééé")),
            Err(BookgateError::WeakPassword { .. })
        ));
        svc.register(&Registration::member("Zoë", "zoe@b.c", "éééééé"))
            .unwrap();
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let svc = service();
        let id = svc
            .register(&Registration::member("Ada", "ada@b.c", "secret1"))
            .unwrap();

        assert_eq!(svc.authenticate("ada@b.c", "secret1").unwrap(), id);
        assert!(matches!(
            svc.authenticate("ada@b.c", "secret2"),
            Err(BookgateError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.authenticate("nobody@b.c", "secret1"),
            Err(BookgateError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.authenticate("ADA@b.c", "secret1"),
            Err(BookgateError::InvalidCredentials)
        ));
    }

    #[test]
    fn librarian_login_rejects_members() {
        let svc = service();
        svc.register(&Registration::member("Mem", "mem@b.c", "secret1"))
            .unwrap();
        svc.register(&Registration::librarian("Lib", "lib@b.c", "secret1", "ADMIN2024"))
            .unwrap();

        assert!(matches!(
            svc.login_as_librarian("mem@b.c", "secret1"),
            Err(BookgateError::NotLibrarian)
        ));
        let session = svc.login_as_librarian("lib@b.c", "secret1").unwrap();
        assert!(session.librarian().is_ok());
        assert_eq!(session.email(), "lib@b.c");

        let member = svc.login("mem@b.c", "secret1").unwrap();
        assert_eq!(member.role(), Role::Member);
    }

    #[test]
    fn role_lookup_by_id_or_email() {
        let svc = service();
        let id = svc
            .register(&Registration::librarian("Lib", "lib@b.c", "secret1", "ADMIN2024"))
            .unwrap();
        assert_eq!(svc.role_of("lib@b.c").unwrap(), Role::Librarian);
        assert_eq!(svc.role_of(id).unwrap(), Role::Librarian);
        assert!(matches!(svc.role_of(UserId(999)), Err(BookgateError::UnknownUser)));
        assert!(svc.is_librarian("lib@b.c").unwrap());
        assert!(!svc.is_librarian("ghost@b.c").unwrap());
    }

    #[test]
    fn bootstrap_librarian_is_idempotent() {
        let svc = service();
        let account = AppConfig::default().bootstrap_librarian.unwrap();
        assert!(svc.ensure_bootstrap_librarian(&account).unwrap());
        assert!(!svc.ensure_bootstrap_librarian(&account).unwrap());

        let session = svc.login_as_librarian(&account.email, &account.password).unwrap();
        assert!(session.is_librarian());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let store = Arc::new(EntityStore::open_in_memory().unwrap());
        let config = AppConfig {
            admission_key: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            IdentityService::new(store, &config),
            Err(BookgateError::Config(_))
        ));
    }
}

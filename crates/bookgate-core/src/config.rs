// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use serde::{Deserialize, Serialize};

use crate::error::{BookgateError, Result};

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Persistent application settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Shared secret required to self-register as a librarian.
    pub admission_key: String,
    /// Minimum password length accepted at registration.
    pub min_password_len: usize,
    /// PBKDF2 iteration count for newly hashed passwords.
    pub pbkdf2_iterations: u32,
    /// Enable audit trail logging.
    pub audit_enabled: bool,
    /// Librarian account created on first start if its email is unknown.
    pub bootstrap_librarian: Option<BootstrapAccount>,
}

/// Credentials of the librarian seeded into an empty installation.
#[derive(Clone, Serialize, Deserialize)]
pub struct BootstrapAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admission_key: "ADMIN2024".into(),
            min_password_len: MIN_PASSWORD_LEN,
            pbkdf2_iterations: 100_000,
            audit_enabled: true,
            bootstrap_librarian: Some(BootstrapAccount {
                name: "Admin".into(),
                email: "admin@bookgate.com".into(),
                password: "admin123".into(),
            }),
        }
    }
}

impl AppConfig {
    /// Reject settings that would weaken the access rules.
    pub fn validate(&self) -> Result<()> {
        if self.admission_key.is_empty() {
            return Err(BookgateError::Config("admission_key must not be empty".into()));
        }
        if self.min_password_len < MIN_PASSWORD_LEN {
            return Err(BookgateError::Config(format!(
                "min_password_len must be at least {MIN_PASSWORD_LEN}"
            )));
        }
        if self.pbkdf2_iterations == 0 {
            return Err(BookgateError::Config("pbkdf2_iterations must be non-zero".into()));
        }
        Ok(())
    }
}

// Secrets are redacted so the config can be traced safely.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("admission_key", &"<redacted>")
            .field("min_password_len", &self.min_password_len)
            .field("pbkdf2_iterations", &self.pbkdf2_iterations)
            .field("audit_enabled", &self.audit_enabled)
            .field("bootstrap_librarian", &self.bootstrap_librarian)
            .finish()
    }
}

impl std::fmt::Debug for BootstrapAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

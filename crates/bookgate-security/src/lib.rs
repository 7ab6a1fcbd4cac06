// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! bookgate-security — secret handling for the Bookgate catalog.
//!
//! Salted password hashing, fingerprints that let logs refer to secrets
//! without containing them, random download-credential generation, and a
//! append-only audit trail.

pub mod audit;
pub mod integrity;
pub mod password;
pub mod tokens;

pub use audit::{AuditEntry, AuditLog};
pub use integrity::{fingerprint, hash_bytes, secrets_match};
pub use password::PasswordHasher;
pub use tokens::generate_token;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Authenticated sessions and the librarian capability.

use bookgate_core::error::{BookgateError, Result};
use bookgate_core::types::{Role, UserId};

/// An authenticated caller. Only `IdentityService` can create one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
    email: String,
    role: Role,
}

impl Session {
    pub(crate) fn new(user_id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_librarian(&self) -> bool {
        self.role.is_librarian()
    }

    /// The capability required by every mutating catalog or credential
    /// operation. Members get `Unauthorized`.
    pub fn librarian(&self) -> Result<LibrarianGrant> {
        if self.role.is_librarian() {
            Ok(LibrarianGrant {
                user_id: self.user_id,
            })
        } else {
            Err(BookgateError::Unauthorized)
        }
    }
}

/// Proof that the holder authenticated as a librarian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibrarianGrant {
    user_id: UserId,
}

impl LibrarianGrant {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bookgate.
//
// Messages never carry passwords, the admission key, or credential values.

use thiserror::Error;

use crate::types::EntryId;

/// Top-level error type for all Bookgate operations.
#[derive(Debug, Error)]
pub enum BookgateError {
    // -- Identity errors --
    #[error("email is already registered")]
    DuplicateEmail,

    #[error("invalid admission key")]
    InvalidAdmissionKey,

    #[error("password must be at least {min_len} characters")]
    WeakPassword { min_len: usize },

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is not registered as a librarian")]
    NotLibrarian,

    #[error("unknown user")]
    UnknownUser,

    #[error("required field is empty: {0}")]
    MissingField(&'static str),

    #[error("operation requires the librarian role")]
    Unauthorized,

    // -- Catalog / credential errors --
    #[error("catalog entry {0} not found")]
    NotFound(EntryId),

    #[error("credential value is already in use")]
    DuplicateValue,

    #[error("invalid download credential")]
    InvalidCredential,

    // -- Security primitives --
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BookgateError>;

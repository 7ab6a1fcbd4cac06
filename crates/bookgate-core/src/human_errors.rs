// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for front ends.
//
// Every technical error maps to a plain sentence plus what the user can do
// about it. The messages deliberately say nothing about *why* a credential
// was rejected.

use crate::error::BookgateError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Storage hiccup; trying the same thing again may work.
    Transient,
    /// The user must change their input (fix a field, use another email).
    ActionRequired,
    /// The caller lacks the right to do this.
    Denied,
    /// Nothing the user can do; needs an operator.
    Permanent,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether repeating the same request unchanged can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    fn new(message: &str, suggestion: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable: severity == Severity::Transient,
            severity,
        }
    }
}

/// Convert a `BookgateError` into something a reader can act on.
pub fn humanize_error(err: &BookgateError) -> HumanError {
    use Severity::*;

    match err {
        // -- Identity --
        BookgateError::DuplicateEmail => HumanError::new(
            "Email already registered.",
            "Please use a different email, or log in with the existing account.",
            ActionRequired,
        ),
        BookgateError::InvalidAdmissionKey => HumanError::new(
            "Invalid admin key.",
            "Ask an existing librarian for the current admission key, or register as a member.",
            ActionRequired,
        ),
        BookgateError::WeakPassword { min_len } => HumanError::new(
            "Password is too short.",
            format!("Passwords must be at least {min_len} characters."),
            ActionRequired,
        ),
        BookgateError::InvalidCredentials => HumanError::new(
            "Invalid email or password.",
            "Check your email and password and try again.",
            ActionRequired,
        ),
        BookgateError::NotLibrarian => HumanError::new(
            "You are not registered as a librarian.",
            "Log in as a member instead.",
            Denied,
        ),
        BookgateError::UnknownUser => HumanError::new(
            "No such user.",
            "Check the email address or register a new account.",
            ActionRequired,
        ),
        BookgateError::MissingField(field) => HumanError::new(
            "Please fill all required fields.",
            format!("The {field} must not be empty."),
            ActionRequired,
        ),
        BookgateError::Unauthorized => HumanError::new(
            "Only librarians can do that.",
            "Log in with a librarian account.",
            Denied,
        ),

        // -- Catalog / credentials --
        BookgateError::NotFound(id) => HumanError::new(
            "Book not found.",
            format!("There is no book with id {id}. List the catalog to see what exists."),
            ActionRequired,
        ),
        BookgateError::DuplicateValue => HumanError::new(
            "That download key already exists.",
            "Choose a different key value, or let Bookgate generate one.",
            ActionRequired,
        ),
        BookgateError::InvalidCredential => HumanError::new(
            "Invalid download key.",
            "Check the key and the book it was issued for.",
            ActionRequired,
        ),

        // -- Internals --
        BookgateError::Crypto(_) => HumanError::new(
            "A security check could not be completed.",
            "Try again. If this keeps happening, ask an operator to check the account data.",
            Permanent,
        ),
        BookgateError::Database(_) => HumanError::new(
            "The catalog database had a problem.",
            "Try again. If this keeps happening, check the data directory.",
            Transient,
        ),
        BookgateError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError::new(
                    "Bookgate doesn't have permission to use its data directory.",
                    "Check the directory permissions or set BOOKGATE_DATA_DIR.",
                    ActionRequired,
                )
            } else {
                HumanError::new(
                    "There was a problem reading or writing a file.",
                    "Try again. If this keeps happening, the disk may be full.",
                    Transient,
                )
            }
        }
        BookgateError::Serialization(_) | BookgateError::Config(_) => HumanError::new(
            "The configuration could not be used.",
            "Check config.json in the data directory.",
            Permanent,
        ),
    }
}

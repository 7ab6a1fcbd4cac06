// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bookgate catalog.

use serde::{Deserialize, Serialize};

use crate::error::BookgateError;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

row_id!(
    /// Identifier of a registered user, assigned by the store.
    UserId
);
row_id!(
    /// Identifier of a catalog entry, assigned by the store.
    EntryId
);
row_id!(
    /// Identifier of a download credential, assigned by the store.
    CredentialId
);

/// Role held by a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Browses the catalog; must redeem a credential to retrieve a document.
    Member,
    /// Publishes and edits entries, issues credentials, bypasses redemption.
    Librarian,
}

impl Role {
    /// Stored representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "Member",
            Self::Librarian => "Librarian",
        }
    }

    pub fn is_librarian(&self) -> bool {
        matches!(self, Self::Librarian)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = BookgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Member" => Ok(Self::Member),
            "Librarian" => Ok(Self::Librarian),
            other => Err(BookgateError::Database(format!("unknown role: {other}"))),
        }
    }
}

/// A registered user. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// How a caller refers to a user when asking for its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(UserId),
    Email(String),
}

impl From<UserId> for UserRef {
    fn from(id: UserId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for UserRef {
    fn from(email: &str) -> Self {
        Self::Email(email.to_owned())
    }
}

impl From<String> for UserRef {
    fn from(email: String) -> Self {
        Self::Email(email)
    }
}

/// A published book in the catalog.
///
/// Locators are opaque references (paths, object keys) to externally stored
/// assets; nothing in Bookgate interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_locator: Option<String>,
    pub document_locator: Option<String>,
}

/// Fields of a catalog entry that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewEntry {
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_locator: Option<String>,
    pub document_locator: Option<String>,
}

impl NewEntry {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            description: description.into(),
            cover_locator: None,
            document_locator: None,
        }
    }

    pub fn with_cover(mut self, locator: impl Into<String>) -> Self {
        self.cover_locator = Some(locator.into());
        self
    }

    pub fn with_document(mut self, locator: impl Into<String>) -> Self {
        self.document_locator = Some(locator.into());
        self
    }
}

/// Replacement record for an existing entry.
///
/// Title, author and description always overwrite. A locator overwrites the
/// stored one only when it is present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryUpdate {
    pub id: EntryId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_locator: Option<String>,
    pub document_locator: Option<String>,
}

impl EntryUpdate {
    pub fn new(
        id: EntryId,
        title: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            description: description.into(),
            cover_locator: None,
            document_locator: None,
        }
    }

    pub fn with_cover(mut self, locator: impl Into<String>) -> Self {
        self.cover_locator = Some(locator.into());
        self
    }

    pub fn with_document(mut self, locator: impl Into<String>) -> Self {
        self.document_locator = Some(locator.into());
        self
    }

    /// The cover locator to write, if any.
    pub fn cover_replacement(&self) -> Option<&str> {
        non_empty(self.cover_locator.as_deref())
    }

    /// The document locator to write, if any.
    pub fn document_replacement(&self) -> Option<&str> {
        non_empty(self.document_locator.as_deref())
    }
}

impl From<CatalogEntry> for EntryUpdate {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            author: entry.author,
            description: entry.description,
            cover_locator: entry.cover_locator,
            document_locator: entry.document_locator,
        }
    }
}

/// A single-use download credential scoped to one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadCredential {
    pub id: CredentialId,
    pub entry_id: EntryId,
    pub value: String,
}

/// A credential together with the title of the entry it unlocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialListing {
    pub id: CredentialId,
    pub entry_id: EntryId,
    pub value: String,
    pub entry_title: String,
}

/// Outcome of asking for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    /// Retrieval allowed; the locator is handed to whatever fetches the asset.
    Granted { document_locator: Option<String> },
    /// The caller must redeem a download credential first.
    RequiresCredential,
}

impl Access {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    pub fn document_locator(&self) -> Option<&str> {
        match self {
            Self::Granted { document_locator } => document_locator.as_deref(),
            Self::RequiresCredential => None,
        }
    }
}

/// `Some(s)` only when `s` contains something other than whitespace.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

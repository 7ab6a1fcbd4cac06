// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command surface of the `bookgate` binary.

use std::path::PathBuf;

use bookgate_core::error::{BookgateError, Result};
use bookgate_core::types::{Access, CatalogEntry, EntryId, EntryUpdate, NewEntry, Role};
use bookgate_store::{Registration, Session};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::services::app_services::{AppServices, key_subject};
use crate::services::data_dir;

#[derive(Parser)]
#[command(name = "bookgate")]
#[command(author, version, about = "Document catalog with single-use download keys", long_about = None)]
pub struct Cli {
    /// Account email
    #[arg(long, global = true, env = "BOOKGATE_EMAIL")]
    email: Option<String>,

    /// Account password
    #[arg(long, global = true, env = "BOOKGATE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Directory holding bookgate.db, audit.db, and config.json
    #[arg(long, global = true, env = "BOOKGATE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

// No `Debug`: variants carry the admission key and download keys.
#[derive(Subcommand)]
pub enum Commands {
    /// Create an account with --email and --password
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Register as a librarian (needs the admission key)
        #[arg(long)]
        librarian: bool,

        /// Admission key for librarian registration
        #[arg(long, env = "BOOKGATE_ADMISSION_KEY", hide_env_values = true)]
        admission_key: Option<String>,
    },

    /// Check credentials and show the account's role
    Login {
        /// Refuse member accounts
        #[arg(long)]
        librarian: bool,
    },

    /// Show the logged-in account
    Whoami,

    /// Browse and manage catalog entries
    Books {
        #[command(subcommand)]
        action: BookCommands,
    },

    /// Manage download keys (librarians only)
    Keys {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Get the document locator for a book
    Download {
        /// Book id
        book: i64,

        /// Download key (members only)
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Show the audit trail (librarians only)
    Audit {
        /// Number of most recent entries
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Only entries about this subject, e.g. "book:3" or "user:a@b.c"
        #[arg(long, conflicts_with = "key")]
        subject: Option<String>,

        /// Only entries about this download key
        #[arg(long)]
        key: Option<String>,
    },

    /// Show the active configuration
    Config {
        /// Write the active configuration to config.json if it does not exist
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand)]
pub enum BookCommands {
    /// List every book
    List,

    /// Find books by title or author
    Search { query: String },

    /// Show one book
    Show { id: i64 },

    /// Publish a new book
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        author: String,
        #[arg(short, long)]
        description: String,
        /// Cover image locator
        #[arg(long)]
        cover: Option<String>,
        /// Document locator
        #[arg(long)]
        document: Option<String>,
    },

    /// Change a book; omitted fields keep their current value
    Edit {
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        author: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        cover: Option<String>,
        #[arg(long)]
        document: Option<String>,
    },

    /// Delete a book and its download keys
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// List outstanding keys
    List {
        /// Only keys for this book
        #[arg(long)]
        book: Option<i64>,
    },

    /// Issue a key for a book
    Issue {
        /// Book id
        book: i64,

        /// Key value; a random one is generated when omitted
        #[arg(long)]
        value: Option<String>,
    },

    /// Delete a key without redeeming it
    Revoke { value: String },
}

impl std::fmt::Debug for Cli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cli")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("data_dir", &self.data_dir)
            .field("json", &self.json)
            .finish_non_exhaustive()
    }
}

/// Strip surrounding whitespace from a typed-in secret or identifier.
/// A value that is only whitespace counts as absent.
fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        let dir = data_dir::data_dir(self.data_dir.as_deref())?;
        let app = AppServices::init(dir)?;

        match &self.command {
            Commands::Register {
                name,
                librarian,
                admission_key,
            } => {
                let (email, password) = self.credentials()?;
                let mut registration = Registration::member(name.trim(), email, password);
                if *librarian {
                    registration.requested_role = Role::Librarian;
                    registration.admission_key = trimmed(admission_key.as_deref()).map(str::to_owned);
                }
                let id = app.register(&registration)?;
                println!("Registered {email} as {} (user {id})", registration.requested_role);
            }

            Commands::Login { librarian } => {
                let session = self.login(&app, *librarian)?;
                println!("Logged in as {} ({})", session.email(), session.role());
            }

            Commands::Whoami => {
                let session = self.login(&app, false)?;
                let user = app.user(session.email())?;
                if self.json {
                    print_json(&user)?;
                } else {
                    println!("{} <{}>", user.name, user.email);
                    println!("  id:   {}", user.id);
                    println!("  role: {}", user.role);
                }
            }

            Commands::Books { action } => self.books(&app, action)?,
            Commands::Keys { action } => self.keys(&app, action)?,

            Commands::Download { book, key } => {
                let session = self.login(&app, false)?;
                match app.download(&session, EntryId(*book), trimmed(key.as_deref()))? {
                    Access::Granted { document_locator } => match document_locator {
                        Some(locator) => println!("{locator}"),
                        None => println!("Book {book} has no document attached."),
                    },
                    Access::RequiresCredential => {
                        return Err(BookgateError::MissingField("download key"));
                    }
                }
            }

            Commands::Audit {
                limit,
                subject,
                key,
            } => {
                let session = self.login(&app, true)?;
                let subject = subject.clone().or_else(|| trimmed(key.as_deref()).map(key_subject));
                let entries = match subject {
                    Some(subject) => app.audit_entries_for_subject(&session, &subject)?,
                    None => app.recent_audit_entries(&session, *limit)?,
                };
                if self.json {
                    print_json(&entries)?;
                } else if entries.is_empty() {
                    println!("No audit entries.");
                } else {
                    for e in &entries {
                        let status = if e.success { "ok  " } else { "FAIL" };
                        println!(
                            "{} {status} {:<14} {} {}",
                            e.timestamp,
                            e.action,
                            e.subject,
                            e.details.as_deref().unwrap_or("")
                        );
                    }
                }
            }

            Commands::Config { init } => {
                if *init && app.write_config_if_missing()? {
                    println!("Wrote {}", app.config_path().display());
                }
                println!("data dir: {}", app.data_dir().display());
                println!("config:   {}", app.config_path().display());
                println!("{:#?}", app.config());
            }
        }

        Ok(())
    }

    fn books(&self, app: &AppServices, action: &BookCommands) -> Result<()> {
        let session = self.login(app, false)?;

        match action {
            BookCommands::List => self.print_entries(&app.books()?)?,
            BookCommands::Search { query } => self.print_entries(&app.search_books(query)?)?,
            BookCommands::Show { id } => {
                let entry = app.book(EntryId(*id))?;
                if self.json {
                    print_json(&entry)?;
                } else {
                    print_entry_detail(&entry);
                }
            }
            BookCommands::Add {
                title,
                author,
                description,
                cover,
                document,
            } => {
                let entry = NewEntry {
                    title: title.clone(),
                    author: author.clone(),
                    description: description.clone(),
                    cover_locator: cover.clone(),
                    document_locator: document.clone(),
                };
                let id = app.add_book(&session, entry)?;
                println!("Added book {id}");
            }
            BookCommands::Edit {
                id,
                title,
                author,
                description,
                cover,
                document,
            } => {
                session.librarian()?;
                let current = app.book(EntryId(*id))?;
                let update = EntryUpdate {
                    id: current.id,
                    title: title.clone().unwrap_or(current.title),
                    author: author.clone().unwrap_or(current.author),
                    description: description.clone().unwrap_or(current.description),
                    cover_locator: cover.clone(),
                    document_locator: document.clone(),
                };
                app.edit_book(&session, update)?;
                println!("Updated book {id}");
            }
            BookCommands::Delete { id } => {
                if app.delete_book(&session, EntryId(*id))? {
                    println!("Deleted book {id}");
                } else {
                    return Err(BookgateError::NotFound(EntryId(*id)));
                }
            }
        }
        Ok(())
    }

    fn keys(&self, app: &AppServices, action: &KeyCommands) -> Result<()> {
        let session = self.login(app, true)?;

        match action {
            KeyCommands::List { book } => {
                let listings = app.keys(&session, book.map(EntryId))?;
                if self.json {
                    print_json(&listings)?;
                } else if listings.is_empty() {
                    println!("No download keys.");
                } else {
                    for l in &listings {
                        println!("{:<34} book {:>4}  {}", l.value, l.entry_id, l.entry_title);
                    }
                }
            }
            KeyCommands::Issue { book, value } => {
                let (_, value) = app.issue_key(&session, EntryId(*book), value.as_deref().map(str::trim))?;
                println!("{value}");
            }
            KeyCommands::Revoke { value } => {
                if app.revoke_key(&session, value.trim())? {
                    println!("Revoked.");
                } else {
                    println!("No such key.");
                }
            }
        }
        Ok(())
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let email = trimmed(self.email.as_deref()).ok_or(BookgateError::MissingField("email"))?;
        let password =
            trimmed(self.password.as_deref()).ok_or(BookgateError::MissingField("password"))?;
        Ok((email, password))
    }

    fn login(&self, app: &AppServices, as_librarian: bool) -> Result<Session> {
        let (email, password) = self.credentials()?;
        app.login(email, password, as_librarian)
    }

    fn print_entries(&self, entries: &[CatalogEntry]) -> Result<()> {
        if self.json {
            return print_json(entries);
        }
        if entries.is_empty() {
            println!("No books.");
        }
        for e in entries {
            println!("{:>4}  {}  by {}", e.id, e.title, e.author);
        }
        Ok(())
    }
}

fn print_entry_detail(entry: &CatalogEntry) {
    println!("{} by {}", entry.title, entry.author);
    println!("  id:       {}", entry.id);
    println!("  cover:    {}", entry.cover_locator.as_deref().unwrap_or("-"));
    println!("  document: {}", entry.document_locator.as_deref().unwrap_or("-"));
    println!();
    println!("{}", entry.description);
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

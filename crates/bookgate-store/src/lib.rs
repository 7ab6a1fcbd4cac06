// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bookgate — persistence and access control for the catalog.
//
// All services share one `Arc<EntityStore>`:
//
//   let store = Arc::new(EntityStore::open(path)?);
//   let identity = IdentityService::new(Arc::clone(&store), &config)?;
//   let catalog = CatalogManager::new(Arc::clone(&store));
//   let gate = CredentialGate::new(store);

pub mod catalog;
pub mod gate;
pub mod identity;
mod schema;
pub mod session;
pub mod store;

pub use catalog::CatalogManager;
pub use gate::CredentialGate;
pub use identity::{IdentityService, Registration};
pub use session::{LibrarianGrant, Session};
pub use store::{EntityStore, LoginRecord, NewUser, Redemption};

//! # Store
//!
//! The shared table handle and the facade providing repository access.
//!
//! ## Atomicity Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Every mutating repository method:                                  │
//! │                                                                     │
//! │  1. validates its plain inputs (no lock held)                       │
//! │  2. acquires the store-wide write guard                             │
//! │  3. runs every referential/uniqueness/stock check                   │
//! │  4. only then touches the first table                               │
//! │  5. releases the guard                                              │
//! │                                                                     │
//! │  Checks precede writes inside one guard, so a failing call commits  │
//! │  nothing and a succeeding call commits all of its rows at once.     │
//! │  Concurrent writers are serialized; readers share the read guard.   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is the integrity enforcement layer: repositories obtained from one
//! [`Store`] are the only code that touches the tables, and the only code
//! allowed to touch more than one table per call.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::repository::association::AssociationRepository;
use crate::repository::catalog::CatalogRepository;
use crate::repository::identity::IdentityRepository;
use crate::repository::ledger::LedgerRepository;
use crate::repository::reference::ReferenceRepository;
use crate::tables::Tables;

/// Shared, lock-guarded table set. Repositories hold cheap clones of this
/// handle the same way SQL repositories hold pool clones.
pub(crate) type SharedTables = Arc<RwLock<Tables>>;

/// Main store handle providing repository access.
///
/// ## Usage
/// ```rust
/// use tally_store::Store;
///
/// let store = Store::new();
/// let country = store.reference().add_country("Chile").unwrap();
/// assert!(store.reference().list_children(&country.id).unwrap().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    tables: SharedTables,
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        info!("initializing store");
        Store {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }

    /// Returns the reference catalog repository (geo tree, categories).
    pub fn reference(&self) -> ReferenceRepository {
        ReferenceRepository::new(self.tables.clone())
    }

    /// Returns the identity repository (principals, roles, benefits).
    pub fn identity(&self) -> IdentityRepository {
        IdentityRepository::new(self.tables.clone())
    }

    /// Returns the item catalog repository (tenants, items, stock).
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.tables.clone())
    }

    /// Returns the association registry (favorites, benefits, ratings).
    pub fn associations(&self) -> AssociationRepository {
        AssociationRepository::new(self.tables.clone())
    }

    /// Returns the transaction ledger repository.
    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.tables.clone())
    }
}

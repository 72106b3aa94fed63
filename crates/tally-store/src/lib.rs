//! # tally-store: Store & Integrity Enforcement for Tally
//!
//! The data layer for the catalog/ledger core: an in-process,
//! concurrency-safe indexed store with the repositories that implement
//! every catalog, identity, association and ledger operation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    callers (request handlers)                   │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────▼──────────────────────────────────┐
//! │                    tally-store (THIS CRATE)                     │
//! │                                                                 │
//! │   Store ──► ReferenceRepository / IdentityRepository /          │
//! │             CatalogRepository / AssociationRepository /         │
//! │             LedgerRepository                                    │
//! │                                                                 │
//! │   all mutations pass through one write-guarded critical         │
//! │   section per call: atomic multi-row writes                     │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────▼──────────────────────────────────┐
//! │              tally-core (pure types & invariants)               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tally_store::Store;
//!
//! let store = Store::new();
//!
//! let category = store.reference().add_category("Beverages")?;
//! let tenant = store.catalog().add_tenant("Cafe Andes", "Alameda 100", None)?;
//! let coffee = store
//!     .catalog()
//!     .create_simple_item(&tenant.id, "Coffee", 1000, 10, &category.id, None)?;
//!
//! let resolved = store.catalog().resolve(&coffee)?;
//! assert_eq!(resolved.price_cents, 1000);
//! # Ok::<(), tally_core::CoreError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod repository;
pub mod store;

mod tables;

// =============================================================================
// Re-exports
// =============================================================================

pub use store::Store;

// Repository re-exports for convenience
pub use repository::association::AssociationRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::identity::IdentityRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::reference::ReferenceRepository;

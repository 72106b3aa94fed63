//! # tally-core: Pure Business Logic for Tally
//!
//! Domain types and invariants for a transactional catalog/ledger system:
//! hierarchical reference data, a single principal namespace, a polymorphic
//! item catalog, and a sale/reservation ledger with frozen line prices.
//!
//! Everything here is pure - no database, no network, no file system. The
//! companion crate `tally-store` enforces the invariants these types declare.
//!
//! ## Modules
//!
//! - [`types`] - Domain types (items, principals, transactions, references)
//! - [`money`] - Fixed-point money (integer cents, no floating point)
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level validation rules
//!
//! ## Example
//!
//! ```rust
//! use tally_core::{ItemRef, Money};
//!
//! let price = Money::from_cents(1000);
//! let line_total = price.multiply_quantity(3);
//! assert_eq!(line_total.cents(), 3000);
//!
//! let item = ItemRef::simple("a3f1...");
//! assert_eq!(item.kind().to_string(), "simple");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single transaction line.
///
/// Guards against fat-finger quantities (1000 typed instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum number of lines in a single transaction.
pub const MAX_TRANSACTION_LINES: usize = 100;

//! Repository implementations, one per component:
//!
//! - [`reference`] - geographic tree and item categories
//! - [`identity`] - principals, roles, benefits, authentication
//! - [`catalog`] - tenants, items, stock, polymorphic resolution
//! - [`association`] - favorites, entitlements, ratings
//! - [`ledger`] - transactions and their lines

pub mod association;
pub mod catalog;
pub mod identity;
pub mod ledger;
pub mod reference;

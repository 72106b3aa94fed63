//! # Table Set
//!
//! The in-memory tables backing the store: one map per entity keyed by
//! surrogate id, plus unique secondary indexes for the principal natural
//! keys. Shared lookup and stock helpers used by several repositories live
//! here so every caller dispatches and checks the same way.
//!
//! Nothing in this module locks; callers hold the store-wide guard (see
//! [`crate::store::Store`]) and the helpers operate on `&self`/`&mut self`
//! inside that critical section.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use tally_core::{
    AssocTarget, Benefit, Category, Commune, CompositeItem, CoreError, CoreResult, Country,
    ItemRef, Principal, Rating, Region, ResolvedItem, Role, SimpleItem, Tenant, Transaction,
    TransactionLine,
};

// =============================================================================
// Records
// =============================================================================

/// Store-private principal row: the public entity plus the argon2 credential
/// hash. The hash never leaves this crate; `authenticate` is its only
/// reader.
#[derive(Debug, Clone)]
pub(crate) struct PrincipalRecord {
    pub principal: Principal,
    pub credential_hash: String,
}

/// A stock movement to apply: (simple item id, quantity).
pub(crate) type StockRequirement = (String, i64);

// =============================================================================
// Tables
// =============================================================================

/// Every table of the store. One instance lives behind the store's RwLock.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    // Reference catalog
    pub countries: HashMap<String, Country>,
    pub regions: HashMap<String, Region>,
    pub communes: HashMap<String, Commune>,
    pub categories: HashMap<String, Category>,

    // Tenants
    pub tenants: HashMap<String, Tenant>,

    // Identity
    pub roles: HashMap<String, Role>,
    pub benefits: HashMap<String, Benefit>,
    pub principals: HashMap<String, PrincipalRecord>,

    /// Natural-key indexes over the whole principal namespace, regardless
    /// of subtype. Keys are stored normalized (trimmed, lowercased where
    /// case-insensitive); values are principal ids.
    pub handle_index: HashMap<String, String>,
    pub email_index: HashMap<String, String>,
    pub national_id_index: HashMap<String, String>,

    // Item catalog
    pub simple_items: HashMap<String, SimpleItem>,
    pub composite_items: HashMap<String, CompositeItem>,

    // Associations & ratings
    pub associations: HashMap<String, BTreeSet<AssocTarget>>,
    /// Keyed by (principal id, simple item id): one rating per pair.
    pub ratings: HashMap<(String, String), Rating>,

    // Ledger
    pub transactions: HashMap<String, Transaction>,
}

impl Tables {
    // -------------------------------------------------------------------------
    // Item lookups
    // -------------------------------------------------------------------------

    /// Returns the live simple item for `id`, if any.
    pub fn live_simple(&self, id: &str) -> Option<&SimpleItem> {
        self.simple_items.get(id).filter(|i| i.is_active)
    }

    /// Returns the live composite item for `id`, if any.
    pub fn live_composite(&self, id: &str) -> Option<&CompositeItem> {
        self.composite_items.get(id).filter(|i| i.is_active)
    }

    /// Resolves a polymorphic item reference to its common fields.
    ///
    /// The single kind-dispatch point of the catalog: a reference resolves
    /// only against the table of its stated kind, and only to a live row.
    pub fn resolve_item(&self, item: &ItemRef) -> CoreResult<ResolvedItem> {
        match item {
            ItemRef::Simple(id) => self.live_simple(id).map(|i| ResolvedItem {
                item: item.clone(),
                name: i.name.clone(),
                price_cents: i.price_cents,
                tenant_id: i.tenant_id.clone(),
            }),
            ItemRef::Composite(id) => self.live_composite(id).map(|i| ResolvedItem {
                item: item.clone(),
                name: i.name.clone(),
                price_cents: i.price_cents,
                tenant_id: i.tenant_id.clone(),
            }),
        }
        .ok_or_else(|| CoreError::DanglingReference {
            kind: item.kind().to_string(),
            id: item.id().to_string(),
        })
    }

    // -------------------------------------------------------------------------
    // Stock accounting
    // -------------------------------------------------------------------------

    /// Expands an item reference into the simple-item stock movements a
    /// sale of `quantity` units needs: the item itself, or every component
    /// of a composite.
    pub fn stock_requirements(
        &self,
        item: &ItemRef,
        quantity: i64,
    ) -> CoreResult<Vec<StockRequirement>> {
        match item {
            ItemRef::Simple(id) => {
                self.live_simple(id)
                    .ok_or_else(|| CoreError::DanglingReference {
                        kind: item.kind().to_string(),
                        id: id.clone(),
                    })?;
                Ok(vec![(id.clone(), quantity)])
            }
            ItemRef::Composite(id) => {
                let composite =
                    self.live_composite(id)
                        .ok_or_else(|| CoreError::DanglingReference {
                            kind: item.kind().to_string(),
                            id: id.clone(),
                        })?;
                Ok(composite
                    .components
                    .iter()
                    .map(|c| (c.clone(), quantity))
                    .collect())
            }
        }
    }

    /// Decrements stock for every requirement, or nothing at all.
    ///
    /// Availability is checked for the full set before the first decrement,
    /// so a late InsufficientStock cannot leave earlier components already
    /// drained. Caller holds the write guard.
    pub fn take_stock(&mut self, requirements: &[StockRequirement]) -> CoreResult<()> {
        for (id, quantity) in requirements {
            let item = self
                .live_simple(id)
                .ok_or_else(|| CoreError::DanglingReference {
                    kind: "simple".to_string(),
                    id: id.clone(),
                })?;
            if item.stock < *quantity {
                return Err(CoreError::InsufficientStock {
                    name: item.name.clone(),
                    available: item.stock,
                    requested: *quantity,
                });
            }
        }

        let now = chrono::Utc::now();
        for (id, quantity) in requirements {
            // Presence was checked above; the guard is still held.
            if let Some(item) = self.simple_items.get_mut(id) {
                item.stock -= quantity;
                item.updated_at = now;
            }
        }

        Ok(())
    }

    /// Expands a committed transaction line into the stock movements that
    /// were reserved for it. Used on the release path (cancel, cascade
    /// removal), so retired rows still count: soft-deleting an item does
    /// not forget its components.
    pub fn line_requirements(&self, line: &TransactionLine) -> Vec<StockRequirement> {
        match &line.item {
            ItemRef::Simple(id) => vec![(id.clone(), line.quantity)],
            ItemRef::Composite(id) => match self.composite_items.get(id) {
                Some(composite) => composite
                    .components
                    .iter()
                    .map(|c| (c.clone(), line.quantity))
                    .collect(),
                None => {
                    warn!(item_id = %id, "stock release skipped: composite row missing");
                    Vec::new()
                }
            },
        }
    }

    /// Returns previously reserved stock to the backing items.
    ///
    /// Items are soft-deleted, never removed, so the rows are normally
    /// still there; stock returned to a retired row is inert until the row
    /// would be reactivated. A missing row is skipped with a warning.
    pub fn release_stock(&mut self, requirements: &[StockRequirement]) {
        let now = chrono::Utc::now();
        for (id, quantity) in requirements {
            match self.simple_items.get_mut(id) {
                Some(item) => {
                    item.stock += quantity;
                    item.updated_at = now;
                }
                None => {
                    warn!(item_id = %id, quantity = %quantity, "stock release skipped: item row missing");
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Unique indexes
    // -------------------------------------------------------------------------

    /// Check-and-insert on the three principal natural-key indexes.
    ///
    /// All keys are checked before any is inserted, so a DuplicateKey on
    /// the second or third field leaves no stale claim behind. Runs under
    /// the write guard, making the whole claim one atomic step. The error
    /// names the first violated field, checked in handle, email,
    /// national-id order.
    pub fn claim_principal_keys(
        &mut self,
        handle_key: &str,
        email_key: &str,
        national_id: &str,
        principal_id: &str,
    ) -> CoreResult<()> {
        if self.handle_index.contains_key(handle_key) {
            return Err(CoreError::duplicate("handle", handle_key));
        }
        if self.email_index.contains_key(email_key) {
            return Err(CoreError::duplicate("email", email_key));
        }
        if self.national_id_index.contains_key(national_id) {
            return Err(CoreError::duplicate("national_id", national_id));
        }

        self.handle_index
            .insert(handle_key.to_string(), principal_id.to_string());
        self.email_index
            .insert(email_key.to_string(), principal_id.to_string());
        self.national_id_index
            .insert(national_id.to_string(), principal_id.to_string());
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

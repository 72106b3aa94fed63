//! # Item Catalog Repository
//!
//! Tenants and the two catalog item kinds. Everything downstream of the
//! catalog (lines, favorites, ratings) addresses items through the
//! polymorphic [`ItemRef`], and [`CatalogRepository::resolve`] is the one
//! lookup they all share.
//!
//! Items are soft-deleted: `retire` flips the live flag and the row stays,
//! so ledger history keeps resolving its snapshots while new references
//! fail with DanglingReference.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use tally_core::validation::{validate_name, validate_price, validate_stock};
use tally_core::{
    CompositeItem, CoreError, CoreResult, ItemRef, ResolvedItem, SimpleItem, Tenant,
};

use crate::store::SharedTables;

/// Repository for tenant and item catalog operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    tables: SharedTables,
}

impl CatalogRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        CatalogRepository { tables }
    }

    // -------------------------------------------------------------------------
    // Tenants
    // -------------------------------------------------------------------------

    /// Inserts a tenant. The commune, when given, must exist in the
    /// reference catalog.
    pub fn add_tenant(
        &self,
        name: &str,
        address: &str,
        commune_id: Option<&str>,
    ) -> CoreResult<Tenant> {
        validate_name(name)?;

        let mut tables = self.tables.write();
        if let Some(commune_id) = commune_id {
            if !tables.communes.contains_key(commune_id) {
                return Err(CoreError::not_found("Commune", commune_id));
            }
        }

        let tenant = Tenant {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            address: address.trim().to_string(),
            commune_id: commune_id.map(str::to_string),
        };

        debug!(id = %tenant.id, name = %tenant.name, "inserting tenant");
        tables.tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(tenant)
    }

    /// Returns a tenant by id.
    pub fn get_tenant(&self, id: &str) -> CoreResult<Tenant> {
        self.tables
            .read()
            .tenants
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Tenant", id))
    }

    // -------------------------------------------------------------------------
    // Item Creation
    // -------------------------------------------------------------------------

    /// Creates a unit-priced, stocked item and returns its reference.
    pub fn create_simple_item(
        &self,
        tenant_id: &str,
        name: &str,
        price_cents: i64,
        initial_stock: i64,
        category_id: &str,
        expiry_date: Option<NaiveDate>,
    ) -> CoreResult<ItemRef> {
        validate_name(name)?;
        validate_price(price_cents)?;
        validate_stock(initial_stock)?;

        let mut tables = self.tables.write();
        if !tables.tenants.contains_key(tenant_id) {
            return Err(CoreError::not_found("Tenant", tenant_id));
        }
        if !tables.categories.contains_key(category_id) {
            return Err(CoreError::not_found("Category", category_id));
        }

        let now = Utc::now();
        let item = SimpleItem {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            category_id: category_id.to_string(),
            name: name.trim().to_string(),
            price_cents,
            stock: initial_stock,
            expiry_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let item_ref = item.item_ref();

        info!(id = %item.id, name = %item.name, stock = %initial_stock, "simple item created");
        tables.simple_items.insert(item.id.clone(), item);
        Ok(item_ref)
    }

    /// Creates a fixed-price bundle of simple items and returns its
    /// reference.
    ///
    /// Components are validated at creation time, not re-checked ad hoc:
    /// every reference must name a live simple item of the same tenant
    /// (InvalidComponent otherwise), the set must be non-empty
    /// (EmptyComposite), and duplicates collapse.
    pub fn create_composite_item(
        &self,
        tenant_id: &str,
        name: &str,
        price_cents: i64,
        components: &[ItemRef],
    ) -> CoreResult<ItemRef> {
        validate_name(name)?;
        validate_price(price_cents)?;

        if components.is_empty() {
            return Err(CoreError::EmptyComposite);
        }

        let mut tables = self.tables.write();
        if !tables.tenants.contains_key(tenant_id) {
            return Err(CoreError::not_found("Tenant", tenant_id));
        }

        let mut component_ids = BTreeSet::new();
        for component in components {
            let id = match component {
                ItemRef::Simple(id) => id,
                ItemRef::Composite(_) => {
                    return Err(CoreError::invalid_component(
                        component.to_string(),
                        "composites may only bundle simple items",
                    ));
                }
            };

            let simple = tables
                .live_simple(id)
                .ok_or_else(|| {
                    CoreError::invalid_component(component.to_string(), "not a live simple item")
                })?;
            if simple.tenant_id != tenant_id {
                return Err(CoreError::invalid_component(
                    component.to_string(),
                    "belongs to a different tenant",
                ));
            }

            component_ids.insert(id.clone());
        }

        let now = Utc::now();
        let item = CompositeItem {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: name.trim().to_string(),
            price_cents,
            components: component_ids.into_iter().collect(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let item_ref = item.item_ref();

        info!(
            id = %item.id,
            name = %item.name,
            components = item.components.len(),
            "composite item created"
        );
        tables.composite_items.insert(item.id.clone(), item);
        Ok(item_ref)
    }

    // -------------------------------------------------------------------------
    // Stock
    // -------------------------------------------------------------------------

    /// Adjusts the stock of a simple item by a delta (negative for sales,
    /// positive for restocking) and returns the new level.
    ///
    /// The would-go-negative check and the mutation happen under one write
    /// guard, so concurrent adjustments cannot both observe the same
    /// pre-decrement level.
    pub fn adjust_stock(&self, item: &ItemRef, delta: i64) -> CoreResult<i64> {
        let id = match item {
            ItemRef::Simple(id) => id,
            ItemRef::Composite(_) => {
                return Err(CoreError::invalid_component(
                    item.to_string(),
                    "composites do not carry stock; adjust their components",
                ));
            }
        };

        let mut tables = self.tables.write();
        let live = tables
            .live_simple(id)
            .ok_or_else(|| CoreError::DanglingReference {
                kind: item.kind().to_string(),
                id: id.clone(),
            })?;

        let new_stock = live.stock + delta;
        if new_stock < 0 {
            return Err(CoreError::InsufficientStock {
                name: live.name.clone(),
                available: live.stock,
                requested: -delta,
            });
        }

        // Liveness was checked above, under the same guard.
        if let Some(row) = tables.simple_items.get_mut(id) {
            row.stock = new_stock;
            row.updated_at = Utc::now();
        }

        debug!(id = %id, delta = %delta, stock = %new_stock, "stock adjusted");
        Ok(new_stock)
    }

    /// Updates the current price of a live item, either kind.
    ///
    /// Only future resolutions see the new price; frozen line snapshots in
    /// the ledger keep the price they captured.
    pub fn update_price(&self, item: &ItemRef, price_cents: i64) -> CoreResult<()> {
        validate_price(price_cents)?;

        let mut tables = self.tables.write();
        let now = Utc::now();

        match item {
            ItemRef::Simple(id) => {
                tables
                    .live_simple(id)
                    .ok_or_else(|| CoreError::DanglingReference {
                        kind: item.kind().to_string(),
                        id: id.clone(),
                    })?;
                if let Some(row) = tables.simple_items.get_mut(id) {
                    row.price_cents = price_cents;
                    row.updated_at = now;
                }
            }
            ItemRef::Composite(id) => {
                tables
                    .live_composite(id)
                    .ok_or_else(|| CoreError::DanglingReference {
                        kind: item.kind().to_string(),
                        id: id.clone(),
                    })?;
                if let Some(row) = tables.composite_items.get_mut(id) {
                    row.price_cents = price_cents;
                    row.updated_at = now;
                }
            }
        }

        debug!(item = %item, price_cents = %price_cents, "price updated");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Resolves a polymorphic item reference to its common fields.
    ///
    /// Fails with DanglingReference when the kind/id pair no longer names
    /// a live item (unknown id, retired item, or wrong kind).
    pub fn resolve(&self, item: &ItemRef) -> CoreResult<ResolvedItem> {
        self.tables.read().resolve_item(item)
    }

    /// Returns a live simple item by id.
    pub fn get_simple(&self, id: &str) -> CoreResult<SimpleItem> {
        self.tables
            .read()
            .live_simple(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("SimpleItem", id))
    }

    /// Returns a live composite item by id.
    pub fn get_composite(&self, id: &str) -> CoreResult<CompositeItem> {
        self.tables
            .read()
            .live_composite(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("CompositeItem", id))
    }

    /// Lists the live items of a tenant, both kinds, sorted by name.
    pub fn list_by_tenant(&self, tenant_id: &str) -> CoreResult<Vec<ResolvedItem>> {
        let tables = self.tables.read();
        if !tables.tenants.contains_key(tenant_id) {
            return Err(CoreError::not_found("Tenant", tenant_id));
        }

        let mut items: Vec<ResolvedItem> = tables
            .simple_items
            .values()
            .filter(|i| i.is_active && i.tenant_id == tenant_id)
            .map(|i| ResolvedItem {
                item: i.item_ref(),
                name: i.name.clone(),
                price_cents: i.price_cents,
                tenant_id: i.tenant_id.clone(),
            })
            .chain(
                tables
                    .composite_items
                    .values()
                    .filter(|i| i.is_active && i.tenant_id == tenant_id)
                    .map(|i| ResolvedItem {
                        item: i.item_ref(),
                        name: i.name.clone(),
                        price_cents: i.price_cents,
                        tenant_id: i.tenant_id.clone(),
                    }),
            )
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    // -------------------------------------------------------------------------
    // Retirement
    // -------------------------------------------------------------------------

    /// Soft-deletes an item. Subsequent resolves of the reference fail
    /// with DanglingReference; committed ledger snapshots are unaffected.
    ///
    /// A simple item still bundled in a live composite cannot be retired
    /// (InvalidComponent), so live composites never reference dead
    /// components.
    pub fn retire(&self, item: &ItemRef) -> CoreResult<()> {
        let mut tables = self.tables.write();
        let now = Utc::now();

        match item {
            ItemRef::Simple(id) => {
                tables
                    .live_simple(id)
                    .ok_or_else(|| CoreError::DanglingReference {
                        kind: item.kind().to_string(),
                        id: id.clone(),
                    })?;

                if let Some(composite) = tables
                    .composite_items
                    .values()
                    .find(|c| c.is_active && c.components.iter().any(|cid| cid == id))
                {
                    return Err(CoreError::invalid_component(
                        item.to_string(),
                        format!("still bundled in live composite '{}'", composite.name),
                    ));
                }

                if let Some(row) = tables.simple_items.get_mut(id) {
                    row.is_active = false;
                    row.updated_at = now;
                }
            }
            ItemRef::Composite(id) => {
                tables
                    .live_composite(id)
                    .ok_or_else(|| CoreError::DanglingReference {
                        kind: item.kind().to_string(),
                        id: id.clone(),
                    })?;

                if let Some(row) = tables.composite_items.get_mut(id) {
                    row.is_active = false;
                    row.updated_at = now;
                }
            }
        }

        info!(item = %item, "item retired");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

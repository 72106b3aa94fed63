//! # Transaction Ledger Repository
//!
//! Sale/reservation headers and their owned lines.
//!
//! ## Transaction Lifecycle
//! ```text
//! open() ──► pending ──add_line()──► pending
//!               │
//!               ├──complete()──► completed   (terminal)
//!               └──cancel()────► cancelled   (terminal, stock released)
//! ```
//!
//! Lines freeze the item's name and unit price at insert time (snapshot
//! pattern: later catalog edits never rewrite history) and reserve backing
//! stock in the same critical section. The stored total is recomputed from
//! the lines after every committed mutation, never trusted from caller
//! input.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use tally_core::validation::validate_quantity;
use tally_core::{
    Annotation, CoreError, CoreResult, ItemRef, Transaction, TransactionLine, TransactionStatus,
    MAX_TRANSACTION_LINES,
};

use crate::store::SharedTables;

/// Repository for ledger operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    tables: SharedTables,
}

impl LedgerRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        LedgerRepository { tables }
    }

    // -------------------------------------------------------------------------
    // Opening
    // -------------------------------------------------------------------------

    /// Opens a pending transaction for a principal at a tenant.
    pub fn open(&self, principal_id: &str, tenant_id: &str) -> CoreResult<Transaction> {
        let mut tables = self.tables.write();

        if !tables.principals.contains_key(principal_id) {
            return Err(CoreError::not_found("Principal", principal_id));
        }
        if !tables.tenants.contains_key(tenant_id) {
            return Err(CoreError::not_found("Tenant", tenant_id));
        }

        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::new_v4().to_string(),
            reference: generate_reference(),
            tenant_id: tenant_id.to_string(),
            principal_id: principal_id.to_string(),
            status: TransactionStatus::Pending,
            total_cents: 0,
            lines: Vec::new(),
            annotations: Vec::new(),
            opened_at: now,
            updated_at: now,
            closed_at: None,
        };

        info!(id = %tx.id, reference = %tx.reference, principal_id = %principal_id, "transaction opened");
        tables.transactions.insert(tx.id.clone(), tx.clone());
        Ok(tx)
    }

    // -------------------------------------------------------------------------
    // Lines
    // -------------------------------------------------------------------------

    /// Adds a line to a pending transaction.
    ///
    /// Resolves the item against the transaction's tenant, freezes its
    /// price and name, and reserves the backing stock (the simple item
    /// itself, or every component of a composite, x quantity). The cover
    /// check, the decrement and the line insert happen under one write
    /// guard: concurrent calls racing for the last unit cannot both
    /// succeed, and a failing call leaves no partial decrement behind.
    pub fn add_line(
        &self,
        tx_id: &str,
        item: &ItemRef,
        quantity: i64,
    ) -> CoreResult<TransactionLine> {
        validate_quantity(quantity)?;

        let mut tables = self.tables.write();

        let tx = tables
            .transactions
            .get(tx_id)
            .ok_or_else(|| CoreError::not_found("Transaction", tx_id))?;
        if tx.status.is_terminal() {
            return Err(CoreError::invalid_state(
                "transaction",
                tx_id,
                tx.status.to_string(),
                "add_line",
            ));
        }
        if tx.lines.len() >= MAX_TRANSACTION_LINES {
            return Err(CoreError::invalid_state(
                "transaction",
                tx_id,
                format!("at {} lines", MAX_TRANSACTION_LINES),
                "add_line",
            ));
        }
        let tenant_id = tx.tenant_id.clone();

        let resolved = tables.resolve_item(item)?;
        if resolved.tenant_id != tenant_id {
            // Not in this tenant's catalog from the caller's side.
            return Err(CoreError::not_found("Item", item.id()));
        }

        let requirements = tables.stock_requirements(item, quantity)?;
        tables.take_stock(&requirements)?;

        let line = TransactionLine {
            id: Uuid::new_v4().to_string(),
            item: item.clone(),
            name_snapshot: resolved.name,
            unit_price_cents: resolved.price_cents,
            quantity,
            line_total_cents: resolved.price_cents * quantity,
            added_at: Utc::now(),
        };

        // Presence was checked above, under the same guard.
        if let Some(tx) = tables.transactions.get_mut(tx_id) {
            tx.lines.push(line.clone());
            tx.total_cents = tx.total_from_lines();
            tx.updated_at = line.added_at;
        }

        debug!(
            tx_id = %tx_id,
            item = %item,
            quantity = %quantity,
            unit_price = %line.unit_price_cents,
            "line added"
        );
        Ok(line)
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Completes a pending transaction. Irreversible.
    ///
    /// The total is recomputed from the lines and asserted one last time
    /// before the status flips.
    pub fn complete(&self, tx_id: &str) -> CoreResult<Transaction> {
        let mut tables = self.tables.write();

        let tx = tables
            .transactions
            .get_mut(tx_id)
            .ok_or_else(|| CoreError::not_found("Transaction", tx_id))?;
        if tx.status.is_terminal() {
            return Err(CoreError::invalid_state(
                "transaction",
                tx_id,
                tx.status.to_string(),
                "complete",
            ));
        }
        if tx.lines.is_empty() {
            return Err(CoreError::EmptyTransaction {
                id: tx_id.to_string(),
            });
        }

        let now = Utc::now();
        tx.total_cents = tx.total_from_lines();
        tx.status = TransactionStatus::Completed;
        tx.updated_at = now;
        tx.closed_at = Some(now);

        info!(id = %tx_id, total_cents = %tx.total_cents, lines = tx.lines.len(), "transaction completed");
        Ok(tx.clone())
    }

    /// Cancels a pending transaction, returning every line's reserved
    /// stock to the catalog. Irreversible.
    pub fn cancel(&self, tx_id: &str) -> CoreResult<Transaction> {
        let mut tables = self.tables.write();

        let tx = tables
            .transactions
            .get(tx_id)
            .ok_or_else(|| CoreError::not_found("Transaction", tx_id))?;
        if tx.status.is_terminal() {
            return Err(CoreError::invalid_state(
                "transaction",
                tx_id,
                tx.status.to_string(),
                "cancel",
            ));
        }

        let lines = tx.lines.clone();
        for line in &lines {
            let requirements = tables.line_requirements(line);
            tables.release_stock(&requirements);
        }

        let now = Utc::now();
        // Presence was checked above, under the same guard.
        let tx = tables
            .transactions
            .get_mut(tx_id)
            .ok_or_else(|| CoreError::not_found("Transaction", tx_id))?;
        tx.status = TransactionStatus::Cancelled;
        tx.updated_at = now;
        tx.closed_at = Some(now);

        info!(id = %tx_id, lines = lines.len(), "transaction cancelled, stock released");
        Ok(tx.clone())
    }

    /// Appends an audit annotation. Allowed in any state; the only
    /// mutation a terminal transaction accepts.
    pub fn annotate(&self, tx_id: &str, text: &str) -> CoreResult<()> {
        let mut tables = self.tables.write();

        let tx = tables
            .transactions
            .get_mut(tx_id)
            .ok_or_else(|| CoreError::not_found("Transaction", tx_id))?;

        tx.annotations.push(Annotation {
            at: Utc::now(),
            text: text.to_string(),
        });

        debug!(tx_id = %tx_id, "transaction annotated");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Returns a transaction by id, lines included.
    pub fn get(&self, tx_id: &str) -> CoreResult<Transaction> {
        self.tables
            .read()
            .transactions
            .get(tx_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Transaction", tx_id))
    }

    /// Lists a principal's transactions, oldest first.
    pub fn list_for_principal(&self, principal_id: &str) -> CoreResult<Vec<Transaction>> {
        let tables = self.tables.read();

        if !tables.principals.contains_key(principal_id) {
            return Err(CoreError::not_found("Principal", principal_id));
        }

        let mut txs: Vec<Transaction> = tables
            .transactions
            .values()
            .filter(|t| t.principal_id == principal_id)
            .cloned()
            .collect();
        txs.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        Ok(txs)
    }
}

/// Generates a human-readable transaction reference: date plus a short
/// random suffix.
fn generate_reference() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect();
    format!("TX-{}-{}", date, suffix.to_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::Store;
    use tally_core::{CoreError, NewPrincipal, PrincipalKind, TransactionStatus};

    struct Fixture {
        store: Store,
        principal: String,
        tenant: String,
        coffee: tally_core::ItemRef,
        muffin: tally_core::ItemRef,
    }

    fn fixture() -> Fixture {
        let store = Store::new();
        let category = store.reference().add_category("Beverages").unwrap();
        let tenant = store
            .catalog()
            .add_tenant("Cafe Andes", "Alameda 100", None)
            .unwrap();
        let coffee = store
            .catalog()
            .create_simple_item(&tenant.id, "Coffee", 1000, 10, &category.id, None)
            .unwrap();
        let muffin = store
            .catalog()
            .create_simple_item(&tenant.id, "Muffin", 800, 10, &category.id, None)
            .unwrap();
        let ada = store
            .identity()
            .create_principal(NewPrincipal {
                kind: PrincipalKind::Client,
                handle: "ada".to_string(),
                email: "ada@example.cl".to_string(),
                national_id: "11.111.111-1".to_string(),
                display_name: "Ada Lovelace".to_string(),
                birth_date: None,
                role_id: None,
                credential: "secret".to_string(),
            })
            .unwrap();

        Fixture {
            principal: ada.id,
            tenant: tenant.id,
            store,
            coffee,
            muffin,
        }
    }

    #[test]
    fn test_open_requires_known_owner() {
        let f = fixture();
        assert!(matches!(
            f.store.ledger().open("missing", &f.tenant),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            f.store.ledger().open(&f.principal, "missing"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_add_line_freezes_price_and_reserves_stock() {
        let f = fixture();
        let ledger = f.store.ledger();

        let tx = ledger.open(&f.principal, &f.tenant).unwrap();
        let line = ledger.add_line(&tx.id, &f.coffee, 3).unwrap();
        assert_eq!(line.unit_price_cents, 1000);
        assert_eq!(line.line_total_cents, 3000);
        assert_eq!(f.store.catalog().get_simple(f.coffee.id()).unwrap().stock, 7);

        // Stored total already reflects the frozen snapshot.
        let tx = ledger.get(&tx.id).unwrap();
        assert_eq!(tx.total_cents, 3000);
    }

    #[test]
    fn test_add_line_rejects_zero_quantity() {
        let f = fixture();
        let ledger = f.store.ledger();
        let tx = ledger.open(&f.principal, &f.tenant).unwrap();

        assert!(matches!(
            ledger.add_line(&tx.id, &f.coffee, 0),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_add_line_rejects_foreign_tenant_item() {
        let f = fixture();
        let other = f
            .store
            .catalog()
            .add_tenant("Camping Sur", "Ruta 5", None)
            .unwrap();
        let tx = f.store.ledger().open(&f.principal, &other.id).unwrap();

        assert!(matches!(
            f.store.ledger().add_line(&tx.id, &f.coffee, 1),
            Err(CoreError::NotFound { .. })
        ));
        // Nothing was reserved.
        assert_eq!(f.store.catalog().get_simple(f.coffee.id()).unwrap().stock, 10);
    }

    #[test]
    fn test_complete_recomputes_total_and_is_terminal() {
        let f = fixture();
        let ledger = f.store.ledger();

        let tx = ledger.open(&f.principal, &f.tenant).unwrap();
        ledger.add_line(&tx.id, &f.coffee, 2).unwrap();
        ledger.add_line(&tx.id, &f.muffin, 1).unwrap();

        let completed = ledger.complete(&tx.id).unwrap();
        assert_eq!(completed.status, TransactionStatus::Completed);
        assert_eq!(completed.total_cents, 2800);
        assert!(completed.closed_at.is_some());

        // Terminal: no further lines or transitions.
        assert!(matches!(
            ledger.add_line(&tx.id, &f.coffee, 1),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            ledger.complete(&tx.id),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            ledger.cancel(&tx.id),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_complete_empty_rejected() {
        let f = fixture();
        let ledger = f.store.ledger();
        let tx = ledger.open(&f.principal, &f.tenant).unwrap();

        assert!(matches!(
            ledger.complete(&tx.id),
            Err(CoreError::EmptyTransaction { .. })
        ));
        // Still pending afterwards.
        assert_eq!(
            ledger.get(&tx.id).unwrap().status,
            TransactionStatus::Pending
        );
    }

    #[test]
    fn test_cancel_releases_stock() {
        let f = fixture();
        let ledger = f.store.ledger();

        let tx = ledger.open(&f.principal, &f.tenant).unwrap();
        ledger.add_line(&tx.id, &f.coffee, 4).unwrap();
        ledger.add_line(&tx.id, &f.muffin, 2).unwrap();
        assert_eq!(f.store.catalog().get_simple(f.coffee.id()).unwrap().stock, 6);
        assert_eq!(f.store.catalog().get_simple(f.muffin.id()).unwrap().stock, 8);

        let cancelled = ledger.cancel(&tx.id).unwrap();
        assert_eq!(cancelled.status, TransactionStatus::Cancelled);
        assert_eq!(f.store.catalog().get_simple(f.coffee.id()).unwrap().stock, 10);
        assert_eq!(f.store.catalog().get_simple(f.muffin.id()).unwrap().stock, 10);
    }

    #[test]
    fn test_annotate_allowed_after_completion() {
        let f = fixture();
        let ledger = f.store.ledger();

        let tx = ledger.open(&f.principal, &f.tenant).unwrap();
        ledger.add_line(&tx.id, &f.coffee, 1).unwrap();
        ledger.complete(&tx.id).unwrap();

        ledger.annotate(&tx.id, "customer asked for receipt copy").unwrap();
        let tx = ledger.get(&tx.id).unwrap();
        assert_eq!(tx.annotations.len(), 1);
        assert_eq!(tx.annotations[0].text, "customer asked for receipt copy");
    }
}

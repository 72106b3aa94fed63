//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 string - immutable, used for relations between tables
//! - natural keys (handle, email, national id) - unique secondary indexes,
//!   never used as primary keys
//!
//! ## Polymorphic Item References
//! Anything that points at a catalog item (transaction lines, favorites,
//! ratings) holds an [`ItemRef`], a sum type over the two item kinds. The
//! catalog's `resolve` operation is the only place that dispatches on the
//! kind, so an invalid kind/id combination is unrepresentable at the type
//! level rather than a row with two nullable foreign keys.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Item References
// =============================================================================

/// The two catalog item kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Simple,
    Composite,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Simple => write!(f, "simple"),
            ItemKind::Composite => write!(f, "composite"),
        }
    }
}

/// Polymorphic reference to a catalog item: a (kind, id) pair that must
/// resolve to exactly one live item of the stated kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    /// A unit-priced, stocked item.
    Simple(String),
    /// A fixed-price bundle of simple items.
    Composite(String),
}

impl ItemRef {
    /// Creates a reference to a simple item.
    pub fn simple(id: impl Into<String>) -> Self {
        ItemRef::Simple(id.into())
    }

    /// Creates a reference to a composite item.
    pub fn composite(id: impl Into<String>) -> Self {
        ItemRef::Composite(id.into())
    }

    /// Returns the kind tag.
    #[inline]
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemRef::Simple(_) => ItemKind::Simple,
            ItemRef::Composite(_) => ItemKind::Composite,
        }
    }

    /// Returns the referenced item id.
    #[inline]
    pub fn id(&self) -> &str {
        match self {
            ItemRef::Simple(id) | ItemRef::Composite(id) => id,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

// =============================================================================
// Rating Score
// =============================================================================

/// Maximum rating score, in tenths (50 tenths = 5.0).
pub const SCORE_MAX_TENTHS: u8 = 50;

/// A rating score in tenths of a point, 0..=50 (0.0 to 5.0 inclusive).
///
/// Fixed-point for the same reason money is: scores are stored and compared
/// exactly, and only rendered as a decimal for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Score(u8);

impl Score {
    /// Creates a score from tenths of a point.
    pub fn from_tenths(tenths: u8) -> Result<Self, ValidationError> {
        if tenths > SCORE_MAX_TENTHS {
            return Err(ValidationError::OutOfRange {
                field: "score".to_string(),
                min: 0,
                max: SCORE_MAX_TENTHS as i64,
            });
        }
        Ok(Score(tenths))
    }

    /// Returns the score in tenths.
    #[inline]
    pub const fn tenths(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

// =============================================================================
// Reference Catalog
// =============================================================================

/// Root of the geographic tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub id: String,
    pub name: String,
}

/// Second level; parent is always a country.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub country_id: String,
}

/// Leaf level; parent is always a region. The typed parent ids make the
/// tree strict: a commune's ancestry terminates at exactly one country and
/// cycles cannot be expressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commune {
    pub id: String,
    pub name: String,
    pub region_id: String,
}

/// A node of the geographic tree, as returned by child listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum GeoNode {
    Country(Country),
    Region(Region),
    Commune(Commune),
}

/// Item category (flat taxonomy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Tenants
// =============================================================================

/// The owning business unit (a cafeteria, a campsite) that scopes items
/// and transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub address: String,
    /// Commune the tenant is located in, if recorded.
    pub commune_id: Option<String>,
}

// =============================================================================
// Identity
// =============================================================================

/// Subtype tag for the single principal namespace. Staff and clients are
/// mutually exclusive views of one identity space, not separate key spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Staff,
    Client,
}

/// A named role with an optional base compensation, referenced by staff
/// principals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    /// Base compensation in cents, if the role carries one.
    pub base_salary_cents: Option<i64>,
}

impl Role {
    /// Returns the base compensation as Money, if set.
    #[inline]
    pub fn base_salary(&self) -> Option<Money> {
        self.base_salary_cents.map(Money::from_cents)
    }
}

/// A user, client or staff member. The credential hash is store-private and
/// deliberately absent from this type; `authenticate` is the only operation
/// that touches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub kind: PrincipalKind,

    /// Unique login handle.
    pub handle: String,

    /// Unique email address.
    pub email: String,

    /// Unique national id string (e.g. a RUT).
    pub national_id: String,

    /// Display name shown in listings.
    pub display_name: String,

    /// Date of birth, if recorded.
    pub birth_date: Option<NaiveDate>,

    /// Assigned role, if any.
    pub role_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a principal. The cleartext credential only exists in
/// this transient value; the store keeps an argon2 hash.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPrincipal {
    pub kind: PrincipalKind,
    pub handle: String,
    pub email: String,
    pub national_id: String,
    pub display_name: String,
    pub birth_date: Option<NaiveDate>,
    pub role_id: Option<String>,
    pub credential: String,
}

/// What to do with a principal's dependent records on removal. The cascade
/// decision is an explicit parameter, never an implicit default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Refuse removal while the principal still owns transactions.
    Restrict,
    /// Cancel pending transactions (releasing reserved stock), then remove
    /// the principal's ledger history, associations and ratings with it.
    Cascade,
}

/// A benefit that can be granted to principals via associations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benefit {
    pub id: String,
    pub value_cents: i64,
    pub description: String,
}

impl Benefit {
    #[inline]
    pub fn value(&self) -> Money {
        Money::from_cents(self.value_cents)
    }
}

// =============================================================================
// Item Catalog
// =============================================================================

/// A unit-priced, stocked catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleItem {
    pub id: String,
    pub tenant_id: String,
    pub category_id: String,
    pub name: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Current stock level; never negative.
    pub stock: i64,

    /// Expiry date for perishables, if tracked.
    pub expiry_date: Option<NaiveDate>,

    /// Whether the item is live (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SimpleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the polymorphic reference to this item.
    #[inline]
    pub fn item_ref(&self) -> ItemRef {
        ItemRef::Simple(self.id.clone())
    }
}

/// A fixed-price bundle referencing a set of simple items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeItem {
    pub id: String,
    pub tenant_id: String,
    pub name: String,

    /// Bundle price in cents; independent of the component prices.
    pub price_cents: i64,

    /// Component simple-item ids. Order-irrelevant, no duplicates; kept
    /// sorted so equality and listings are deterministic.
    pub components: Vec<String>,

    /// Whether the item is live (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompositeItem {
    /// Returns the bundle price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the polymorphic reference to this item.
    #[inline]
    pub fn item_ref(&self) -> ItemRef {
        ItemRef::Composite(self.id.clone())
    }
}

/// The result of resolving an [`ItemRef`]: the common fields every consumer
/// of the catalog needs, regardless of the underlying item kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub item: ItemRef,
    pub name: String,
    pub price_cents: i64,
    pub tenant_id: String,
}

impl ResolvedItem {
    #[inline]
    pub fn kind(&self) -> ItemKind {
        self.item.kind()
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Associations & Ratings
// =============================================================================

/// Target of a principal association. The sum type keeps the two link
/// variants (benefit entitlements, item favorites) in one registry without
/// mixing their key spaces.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "target", content = "ref", rename_all = "snake_case")]
pub enum AssocTarget {
    Benefit(String),
    Item(ItemRef),
}

/// A principal's score for a simple item. One rating per (principal, item)
/// pair; re-rating replaces the previous score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub id: String,
    pub principal_id: String,
    pub item_id: String,
    pub score: Score,
    pub rated_at: DateTime<Utc>,
}

// =============================================================================
// Transaction Ledger
// =============================================================================

/// The status of a ledger transaction.
///
/// ```text
/// pending --add_line--> pending
/// pending --complete--> completed   (terminal)
/// pending --cancel----> cancelled   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Open; lines may be added.
    Pending,
    /// Finalized; immutable except for audit annotations.
    Completed,
    /// Abandoned; reserved stock has been released.
    Cancelled,
}

impl TransactionStatus {
    /// Completed and cancelled transactions accept no further transitions.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A line item in a transaction.
/// Uses the snapshot pattern to freeze item data at insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLine {
    pub id: String,
    pub item: ItemRef,

    /// Item name at insert time (frozen).
    pub name_snapshot: String,

    /// Unit price in cents at insert time (frozen); decoupled from the
    /// catalog item's current price.
    pub unit_price_cents: i64,

    /// Quantity; always positive.
    pub quantity: i64,

    /// Line total (unit price x quantity).
    pub line_total_cents: i64,

    pub added_at: DateTime<Utc>,
}

impl TransactionLine {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// An append-only audit note on a transaction. The only mutation a terminal
/// transaction accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// A sale/reservation header together with its owned lines. Lines have no
/// lifecycle of their own, so they live inside the header record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,

    /// Human-readable reference number (natural key for receipts).
    pub reference: String,

    pub tenant_id: String,
    pub principal_id: String,
    pub status: TransactionStatus,

    /// Always equals the recomputed sum of the lines.
    pub total_cents: i64,

    pub lines: Vec<TransactionLine>,
    pub annotations: Vec<Annotation>,

    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set when the transaction reaches a terminal state.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Recomputes the total from the lines. The ledger asserts this equals
    /// the stored total after every committed mutation.
    pub fn total_from_lines(&self) -> i64 {
        self.lines.iter().map(|l| l.line_total_cents).sum()
    }

    /// Returns the stored total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_ref_accessors() {
        let r = ItemRef::simple("abc");
        assert_eq!(r.kind(), ItemKind::Simple);
        assert_eq!(r.id(), "abc");
        assert_eq!(r.to_string(), "simple:abc");

        let c = ItemRef::composite("xyz");
        assert_eq!(c.kind(), ItemKind::Composite);
        assert_eq!(c.id(), "xyz");
    }

    #[test]
    fn test_item_ref_serde_tag_shape() {
        let r = ItemRef::composite("combo-1");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["kind"], "composite");
        assert_eq!(json["id"], "combo-1");
    }

    #[test]
    fn test_score_range() {
        assert!(Score::from_tenths(0).is_ok());
        assert_eq!(Score::from_tenths(50).unwrap().tenths(), 50);
        assert!(Score::from_tenths(51).is_err());
        assert_eq!(Score::from_tenths(37).unwrap().to_string(), "3.7");
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Cancelled.is_terminal());
        assert_eq!(TransactionStatus::default(), TransactionStatus::Pending);
    }

    #[test]
    fn test_total_from_lines() {
        let now = Utc::now();
        let line = |price: i64, qty: i64| TransactionLine {
            id: "l".to_string(),
            item: ItemRef::simple("i"),
            name_snapshot: "x".to_string(),
            unit_price_cents: price,
            quantity: qty,
            line_total_cents: price * qty,
            added_at: now,
        };
        let tx = Transaction {
            id: "t".to_string(),
            reference: "TX-1".to_string(),
            tenant_id: "tn".to_string(),
            principal_id: "p".to_string(),
            status: TransactionStatus::Pending,
            total_cents: 0,
            lines: vec![line(1000, 3), line(250, 2)],
            annotations: Vec::new(),
            opened_at: now,
            updated_at: now,
            closed_at: None,
        };
        assert_eq!(tx.total_from_lines(), 3500);
    }
}

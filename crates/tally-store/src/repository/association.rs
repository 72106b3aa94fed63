//! # Association Registry
//!
//! Many-to-many links between principals and benefits or catalog items
//! (entitlements and favorites), plus per-item ratings. A (principal,
//! target) pair exists at most once; linking an existing pair is a no-op,
//! not an error, and unlinking an absent one likewise.

use std::collections::hash_map::Entry;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use tally_core::{AssocTarget, CoreError, CoreResult, Rating, Score};

use crate::store::SharedTables;

/// Repository for associations and ratings.
#[derive(Debug, Clone)]
pub struct AssociationRepository {
    tables: SharedTables,
}

impl AssociationRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        AssociationRepository { tables }
    }

    // -------------------------------------------------------------------------
    // Links
    // -------------------------------------------------------------------------

    /// Links a principal to a target. Idempotent: an existing pair is left
    /// as is. The target must resolve at link time - an unknown benefit is
    /// NotFound, a dead item reference is DanglingReference.
    pub fn link(&self, principal_id: &str, target: AssocTarget) -> CoreResult<()> {
        let mut tables = self.tables.write();

        if !tables.principals.contains_key(principal_id) {
            return Err(CoreError::not_found("Principal", principal_id));
        }

        match &target {
            AssocTarget::Benefit(id) => {
                if !tables.benefits.contains_key(id) {
                    return Err(CoreError::not_found("Benefit", id));
                }
            }
            AssocTarget::Item(item) => {
                tables.resolve_item(item)?;
            }
        }

        let inserted = tables
            .associations
            .entry(principal_id.to_string())
            .or_default()
            .insert(target.clone());

        if inserted {
            debug!(principal_id = %principal_id, target = ?target, "association linked");
        } else {
            debug!(principal_id = %principal_id, target = ?target, "association already present");
        }
        Ok(())
    }

    /// Removes a link. Removing an absent pair is a no-op.
    pub fn unlink(&self, principal_id: &str, target: &AssocTarget) -> CoreResult<()> {
        let mut tables = self.tables.write();

        if !tables.principals.contains_key(principal_id) {
            return Err(CoreError::not_found("Principal", principal_id));
        }

        if let Some(targets) = tables.associations.get_mut(principal_id) {
            if targets.remove(target) {
                debug!(principal_id = %principal_id, target = ?target, "association unlinked");
            }
        }
        Ok(())
    }

    /// Lists a principal's associations in a stable order.
    pub fn list_for(&self, principal_id: &str) -> CoreResult<Vec<AssocTarget>> {
        let tables = self.tables.read();

        if !tables.principals.contains_key(principal_id) {
            return Err(CoreError::not_found("Principal", principal_id));
        }

        Ok(tables
            .associations
            .get(principal_id)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default())
    }

    // -------------------------------------------------------------------------
    // Ratings
    // -------------------------------------------------------------------------

    /// Records a principal's score for a live simple item. One rating per
    /// (principal, item): rating again replaces the score and timestamp,
    /// keeping the rating id stable.
    pub fn rate(&self, principal_id: &str, item_id: &str, score: Score) -> CoreResult<Rating> {
        let mut tables = self.tables.write();

        if !tables.principals.contains_key(principal_id) {
            return Err(CoreError::not_found("Principal", principal_id));
        }
        if tables.live_simple(item_id).is_none() {
            return Err(CoreError::DanglingReference {
                kind: "simple".to_string(),
                id: item_id.to_string(),
            });
        }

        let key = (principal_id.to_string(), item_id.to_string());
        let now = Utc::now();

        let rating = match tables.ratings.entry(key) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.score = score;
                existing.rated_at = now;
                existing.clone()
            }
            Entry::Vacant(entry) => entry
                .insert(Rating {
                    id: Uuid::new_v4().to_string(),
                    principal_id: principal_id.to_string(),
                    item_id: item_id.to_string(),
                    score,
                    rated_at: now,
                })
                .clone(),
        };

        debug!(principal_id = %principal_id, item_id = %item_id, score = %score, "item rated");
        Ok(rating)
    }

    /// Lists the ratings recorded for an item. History survives the item's
    /// retirement.
    pub fn ratings_for_item(&self, item_id: &str) -> Vec<Rating> {
        let mut ratings: Vec<Rating> = self
            .tables
            .read()
            .ratings
            .values()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| a.rated_at.cmp(&b.rated_at));
        ratings
    }

    /// Mean score for an item, for display only. None if unrated.
    pub fn average_score(&self, item_id: &str) -> Option<f64> {
        let tables = self.tables.read();
        let mut count = 0u32;
        let mut sum_tenths = 0u32;
        for rating in tables.ratings.values().filter(|r| r.item_id == item_id) {
            count += 1;
            sum_tenths += rating.score.tenths() as u32;
        }
        if count == 0 {
            return None;
        }
        Some(sum_tenths as f64 / 10.0 / count as f64)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::Store;
    use tally_core::{AssocTarget, CoreError, NewPrincipal, PrincipalKind, Score};

    fn fixture() -> (Store, String, tally_core::ItemRef) {
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
        (store, ada.id, coffee)
    }

    #[test]
    fn test_link_is_idempotent() {
        let (store, ada, coffee) = fixture();
        let associations = store.associations();

        let favorite = AssocTarget::Item(coffee);
        associations.link(&ada, favorite.clone()).unwrap();
        associations.link(&ada, favorite.clone()).unwrap();

        // Exactly one row despite two calls.
        assert_eq!(associations.list_for(&ada).unwrap(), vec![favorite]);
    }

    #[test]
    fn test_unlink_absent_is_noop() {
        let (store, ada, coffee) = fixture();
        let associations = store.associations();

        associations
            .unlink(&ada, &AssocTarget::Item(coffee))
            .unwrap();
        assert!(associations.list_for(&ada).unwrap().is_empty());
    }

    #[test]
    fn test_link_requires_resolvable_target() {
        let (store, ada, coffee) = fixture();
        let associations = store.associations();

        assert!(matches!(
            associations.link(&ada, AssocTarget::Benefit("missing".to_string())),
            Err(CoreError::NotFound { .. })
        ));

        store.catalog().retire(&coffee).unwrap();
        assert!(matches!(
            associations.link(&ada, AssocTarget::Item(coffee)),
            Err(CoreError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_benefit_link() {
        let (store, ada, _) = fixture();
        let benefit = store
            .identity()
            .add_benefit(5000, "Lunch allowance")
            .unwrap();

        store
            .associations()
            .link(&ada, AssocTarget::Benefit(benefit.id.clone()))
            .unwrap();
        assert_eq!(
            store.associations().list_for(&ada).unwrap(),
            vec![AssocTarget::Benefit(benefit.id)]
        );
    }

    #[test]
    fn test_rate_upserts() {
        let (store, ada, coffee) = fixture();
        let associations = store.associations();

        let first = associations
            .rate(&ada, coffee.id(), Score::from_tenths(40).unwrap())
            .unwrap();
        let second = associations
            .rate(&ada, coffee.id(), Score::from_tenths(25).unwrap())
            .unwrap();

        assert_eq!(first.id, second.id);
        let ratings = associations.ratings_for_item(coffee.id());
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].score.tenths(), 25);
        assert_eq!(associations.average_score(coffee.id()), Some(2.5));
    }
}

//! # Reference Catalog Repository
//!
//! Hierarchical lookup data: the country -> region -> commune tree and the
//! flat item category taxonomy. Read-mostly; the only mutation is insert
//! with parent validation.
//!
//! The tree is strict by construction - a region's parent field can only
//! hold a country id and a commune's only a region id - so cycles are
//! unrepresentable and resolution always terminates.

use tracing::debug;
use uuid::Uuid;

use tally_core::validation::validate_name;
use tally_core::{Category, Commune, CoreError, CoreResult, Country, GeoNode, Region};

use crate::store::SharedTables;

/// Repository for reference catalog operations.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    tables: SharedTables,
}

impl ReferenceRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        ReferenceRepository { tables }
    }

    // -------------------------------------------------------------------------
    // Inserts
    // -------------------------------------------------------------------------

    /// Inserts a country (a tree root).
    pub fn add_country(&self, name: &str) -> CoreResult<Country> {
        validate_name(name)?;

        let country = Country {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
        };

        debug!(id = %country.id, name = %country.name, "inserting country");
        self.tables
            .write()
            .countries
            .insert(country.id.clone(), country.clone());
        Ok(country)
    }

    /// Inserts a region under an existing country.
    ///
    /// Fails with OrphanReference if the declared country does not exist.
    pub fn add_region(&self, name: &str, country_id: &str) -> CoreResult<Region> {
        validate_name(name)?;

        let mut tables = self.tables.write();
        if !tables.countries.contains_key(country_id) {
            return Err(CoreError::orphan("region", country_id));
        }

        let region = Region {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            country_id: country_id.to_string(),
        };

        debug!(id = %region.id, name = %region.name, country_id = %country_id, "inserting region");
        tables.regions.insert(region.id.clone(), region.clone());
        Ok(region)
    }

    /// Inserts a commune under an existing region.
    ///
    /// Fails with OrphanReference if the declared region does not exist.
    pub fn add_commune(&self, name: &str, region_id: &str) -> CoreResult<Commune> {
        validate_name(name)?;

        let mut tables = self.tables.write();
        if !tables.regions.contains_key(region_id) {
            return Err(CoreError::orphan("commune", region_id));
        }

        let commune = Commune {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            region_id: region_id.to_string(),
        };

        debug!(id = %commune.id, name = %commune.name, region_id = %region_id, "inserting commune");
        tables.communes.insert(commune.id.clone(), commune.clone());
        Ok(commune)
    }

    /// Inserts an item category.
    pub fn add_category(&self, name: &str) -> CoreResult<Category> {
        validate_name(name)?;

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
        };

        debug!(id = %category.id, name = %category.name, "inserting category");
        self.tables
            .write()
            .categories
            .insert(category.id.clone(), category.clone());
        Ok(category)
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Resolves a commune to its full ancestry chain.
    ///
    /// Fails with NotFound if any link of the chain is missing; never
    /// returns a partial chain.
    pub fn resolve_commune(&self, id: &str) -> CoreResult<(Commune, Region, Country)> {
        let tables = self.tables.read();

        let commune = tables
            .communes
            .get(id)
            .ok_or_else(|| CoreError::not_found("Commune", id))?;
        let region = tables
            .regions
            .get(&commune.region_id)
            .ok_or_else(|| CoreError::not_found("Region", &commune.region_id))?;
        let country = tables
            .countries
            .get(&region.country_id)
            .ok_or_else(|| CoreError::not_found("Country", &region.country_id))?;

        Ok((commune.clone(), region.clone(), country.clone()))
    }

    /// Lists the direct children of a geographic node: the regions of a
    /// country, the communes of a region, nothing for a commune.
    ///
    /// Fails with NotFound if the id matches no node at any level.
    pub fn list_children(&self, node_id: &str) -> CoreResult<Vec<GeoNode>> {
        let tables = self.tables.read();

        if tables.countries.contains_key(node_id) {
            let mut children: Vec<Region> = tables
                .regions
                .values()
                .filter(|r| r.country_id == node_id)
                .cloned()
                .collect();
            children.sort_by(|a, b| a.name.cmp(&b.name));
            return Ok(children.into_iter().map(GeoNode::Region).collect());
        }

        if tables.regions.contains_key(node_id) {
            let mut children: Vec<Commune> = tables
                .communes
                .values()
                .filter(|c| c.region_id == node_id)
                .cloned()
                .collect();
            children.sort_by(|a, b| a.name.cmp(&b.name));
            return Ok(children.into_iter().map(GeoNode::Commune).collect());
        }

        if tables.communes.contains_key(node_id) {
            return Ok(Vec::new());
        }

        Err(CoreError::not_found("geo node", node_id))
    }

    /// Returns a category by id.
    pub fn get_category(&self, id: &str) -> CoreResult<Category> {
        self.tables
            .read()
            .categories
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Category", id))
    }

    /// Lists all categories, sorted by name.
    pub fn list_categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> =
            self.tables.read().categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        categories
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::Store;
    use tally_core::{CoreError, GeoNode};

    #[test]
    fn test_resolve_commune_full_chain() {
        let store = Store::new();
        let reference = store.reference();

        let country = reference.add_country("Chile").unwrap();
        let region = reference
            .add_region("Region Metropolitana", &country.id)
            .unwrap();
        let commune = reference.add_commune("Santiago", &region.id).unwrap();

        let (c, r, n) = reference.resolve_commune(&commune.id).unwrap();
        assert_eq!(c.name, "Santiago");
        assert_eq!(r.id, region.id);
        assert_eq!(n.id, country.id);
    }

    #[test]
    fn test_resolve_commune_missing() {
        let store = Store::new();
        let err = store.reference().resolve_commune("nope").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_insert_orphan_rejected() {
        let store = Store::new();
        let err = store.reference().add_region("Maule", "missing").unwrap_err();
        assert!(matches!(err, CoreError::OrphanReference { .. }));

        let err = store
            .reference()
            .add_commune("Talca", "missing")
            .unwrap_err();
        assert!(matches!(err, CoreError::OrphanReference { .. }));
    }

    #[test]
    fn test_list_children_levels() {
        let store = Store::new();
        let reference = store.reference();

        let country = reference.add_country("Chile").unwrap();
        let region = reference.add_region("Valparaiso", &country.id).unwrap();
        reference.add_commune("Quilpue", &region.id).unwrap();
        reference.add_commune("Concon", &region.id).unwrap();

        let regions = reference.list_children(&country.id).unwrap();
        assert_eq!(regions.len(), 1);
        assert!(matches!(&regions[0], GeoNode::Region(r) if r.name == "Valparaiso"));

        let communes = reference.list_children(&region.id).unwrap();
        assert_eq!(communes.len(), 2);
        // Sorted by name.
        assert!(matches!(&communes[0], GeoNode::Commune(c) if c.name == "Concon"));

        let commune_id = match &communes[0] {
            GeoNode::Commune(c) => c.id.clone(),
            _ => unreachable!(),
        };
        assert!(reference.list_children(&commune_id).unwrap().is_empty());

        assert!(matches!(
            reference.list_children("unknown"),
            Err(CoreError::NotFound { .. })
        ));
    }
}

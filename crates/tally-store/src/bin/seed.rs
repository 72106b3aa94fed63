//! # Seed Data Generator
//!
//! Populates a fresh store with demo data and walks one full sale
//! scenario end to end.
//!
//! ## Usage
//! ```bash
//! cargo run -p tally-store --bin seed
//!
//! # With repository tracing:
//! RUST_LOG=debug cargo run -p tally-store --bin seed
//! ```

use tally_core::{AssocTarget, ItemRef, Money, NewPrincipal, PrincipalKind, Score};
use tally_store::Store;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!();

    let store = Store::new();

    // Reference catalog: one geo chain and the category taxonomy.
    let chile = store.reference().add_country("Chile")?;
    let metropolitana = store
        .reference()
        .add_region("Region Metropolitana", &chile.id)?;
    let santiago = store.reference().add_commune("Santiago", &metropolitana.id)?;
    let beverages = store.reference().add_category("Beverages")?;
    let bakery = store.reference().add_category("Bakery")?;
    println!("✓ Reference catalog seeded");

    // Tenant located in the seeded commune.
    let cafeteria = store
        .catalog()
        .add_tenant("Cafeteria Central", "Alameda 100", Some(&santiago.id))?;
    let (commune, region, country) = store.reference().resolve_commune(&santiago.id)?;
    println!(
        "✓ Tenant '{}' in {}, {}, {}",
        cafeteria.name, commune.name, region.name, country.name
    );

    // Identity: one staff member with a role, one client.
    let barista_role = store.identity().add_role("barista", Some(52_000_000))?;
    let staff = store.identity().create_principal(NewPrincipal {
        kind: PrincipalKind::Staff,
        handle: "vale".to_string(),
        email: "vale@cafeteria.cl".to_string(),
        national_id: "12.345.678-5".to_string(),
        display_name: "Valentina Rojas".to_string(),
        birth_date: None,
        role_id: Some(barista_role.id.clone()),
        credential: "espresso con crema".to_string(),
    })?;
    let client = store.identity().create_principal(NewPrincipal {
        kind: PrincipalKind::Client,
        handle: "ada".to_string(),
        email: "ada@example.cl".to_string(),
        national_id: "11.111.111-1".to_string(),
        display_name: "Ada Lovelace".to_string(),
        birth_date: None,
        role_id: None,
        credential: "correct horse battery".to_string(),
    })?;
    println!("✓ Principals: {} (staff), {} (client)", staff.handle, client.handle);

    let lunch = store.identity().add_benefit(350_000, "Lunch allowance")?;
    store
        .associations()
        .link(&staff.id, AssocTarget::Benefit(lunch.id.clone()))?;

    // Item catalog: two simple items and a bundle.
    let coffee = store
        .catalog()
        .create_simple_item(&cafeteria.id, "Coffee", 180_000, 10, &beverages.id, None)?;
    let muffin = store
        .catalog()
        .create_simple_item(&cafeteria.id, "Muffin", 150_000, 10, &bakery.id, None)?;
    let combo = store.catalog().create_composite_item(
        &cafeteria.id,
        "Breakfast Combo",
        290_000,
        &[coffee.clone(), muffin.clone()],
    )?;
    println!("✓ Catalog: Coffee, Muffin, Breakfast Combo");

    // Client favors the combo and rates the coffee.
    store
        .associations()
        .link(&client.id, AssocTarget::Item(combo.clone()))?;
    store
        .associations()
        .rate(&client.id, coffee.id(), Score::from_tenths(45)?)?;

    // Scenario: a sale of two coffees and one combo.
    println!();
    println!("Running sale scenario...");
    let tx = store.ledger().open(&client.id, &cafeteria.id)?;
    store.ledger().add_line(&tx.id, &coffee, 2)?;
    store.ledger().add_line(&tx.id, &combo, 1)?;
    let completed = store.ledger().complete(&tx.id)?;

    println!("✓ Transaction {} completed", completed.reference);
    println!("  total: {}", Money::from_cents(completed.total_cents));
    for line in &completed.lines {
        println!(
            "  {} x{} @ {} = {}",
            line.name_snapshot,
            line.quantity,
            line.unit_price(),
            line.line_total()
        );
    }

    let coffee_left = stock_of(&store, &coffee)?;
    let muffin_left = stock_of(&store, &muffin)?;
    println!("  stock after sale: coffee {}, muffin {}", coffee_left, muffin_left);

    // And one cancelled reservation to show the release path.
    let tx = store.ledger().open(&client.id, &cafeteria.id)?;
    store.ledger().add_line(&tx.id, &combo, 3)?;
    store.ledger().cancel(&tx.id)?;
    store
        .ledger()
        .annotate(&tx.id, "cancelled at the counter")?;

    println!(
        "✓ Reservation cancelled, stock restored: coffee {}, muffin {}",
        stock_of(&store, &coffee)?,
        stock_of(&store, &muffin)?
    );

    println!();
    println!("Done.");
    Ok(())
}

fn stock_of(store: &Store, item: &ItemRef) -> Result<i64, Box<dyn std::error::Error>> {
    Ok(store.catalog().get_simple(item.id())?.stock)
}

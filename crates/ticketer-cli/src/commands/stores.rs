//! Store and product catalog commands

use anyhow::Result;
use ticketer_core::dto::receipt_list;
use ticketer_core::models::Page;
use ticketer_core::Database;

use super::receipts::print_receipt_list;

pub fn cmd_stores_list(db: &Database) -> Result<()> {
    let stores = db.list_stores()?;
    if stores.is_empty() {
        println!("No stores yet. Process a receipt first.");
        return Ok(());
    }

    println!("{:>6}  {}", "ID", "STORE");
    println!("{}", "-".repeat(40));
    for store in &stores {
        println!("{:>6}  {}", store.id, store.name);
    }
    Ok(())
}

pub fn cmd_stores_products(db: &Database, store_id: i64) -> Result<()> {
    let store = db.get_store(store_id)?;
    let products = db.list_products_by_store(store_id)?;

    println!("🏪 {} ({} products)\n", store.name, products.len());
    for product in &products {
        println!("{:>6}  {}", product.id, product.name);
    }
    Ok(())
}

pub fn cmd_stores_receipts(db: &Database, store_id: i64, limit: i64, offset: i64) -> Result<()> {
    let store = db.get_store(store_id)?;
    let summaries = db.receipts_by_store(store_id, Page::new(limit, offset))?;

    println!("🏪 {}\n", store.name);
    print_receipt_list(&receipt_list(&summaries));
    Ok(())
}

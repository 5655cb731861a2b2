//! Item command implementations

use anyhow::Result;
use ticketer_core::Database;

pub fn cmd_items_update(db: &Database, id: i64, quantity: f64, price: f64) -> Result<()> {
    db.update_item(id, quantity, price)?;
    let item = db.get_item(id)?;
    println!(
        "✏️  Updated item #{} on receipt #{}: {} x {:.2} = {:.2}",
        item.id,
        item.receipt_id,
        item.quantity,
        item.price_paid,
        item.subtotal()
    );
    Ok(())
}

//! Receipt command implementations

use anyhow::{Context, Result};
use ticketer_core::db::parse_bought_date;
use ticketer_core::dto::receipt_list;
use ticketer_core::models::Page;
use ticketer_core::{Database, ReceiptListItem, ReceiptResponse};

use super::truncate;

pub fn cmd_receipts_list(db: &Database, limit: i64, offset: i64) -> Result<()> {
    let receipts = receipt_list(&db.list_receipts(Page::new(limit, offset))?);
    print_receipt_list(&receipts);
    Ok(())
}

pub fn cmd_receipts_range(
    db: &Database,
    from: &str,
    to: &str,
    limit: i64,
    offset: i64,
) -> Result<()> {
    let from_date = parse_bought_date(from).context("Invalid --from date (use YYYY-MM-DD)")?;
    let to_date = parse_bought_date(to).context("Invalid --to date (use YYYY-MM-DD)")?;

    let summaries =
        db.list_receipts_by_date_range(from_date, to_date, Page::new(limit, offset))?;
    println!("📅 Receipts from {} to {}\n", from_date, to_date);
    print_receipt_list(&receipt_list(&summaries));
    Ok(())
}

pub fn cmd_receipts_show(db: &Database, id: i64) -> Result<()> {
    let receipt = db.get_receipt(id)?;
    print_receipt(&ReceiptResponse::from(receipt));
    Ok(())
}

pub fn cmd_receipts_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_receipt(id)?;
    println!("🗑️  Deleted receipt #{}", id);
    Ok(())
}

pub(crate) fn print_receipt_list(receipts: &[ReceiptListItem]) {
    if receipts.is_empty() {
        println!("No receipts found.");
        return;
    }

    println!(
        "{:>6}  {:<10}  {:<24}  {:>5}  {:>10}",
        "ID", "DATE", "STORE", "ITEMS", "TOTAL"
    );
    println!("{}", "-".repeat(64));

    for r in receipts {
        println!(
            "{:>6}  {:<10}  {:<24}  {:>5}  {:>10.2}",
            r.id,
            r.bought_date,
            truncate(&r.store_name, 24),
            r.item_count,
            r.total_amount
        );
    }

    println!();
    println!("{} receipt(s)", receipts.len());
}

pub(crate) fn print_receipt(receipt: &ReceiptResponse) {
    if receipt.id > 0 {
        println!("🧾 Receipt #{}", receipt.id);
    } else {
        println!("🧾 Receipt (not saved)");
    }
    println!("   Store: {}", receipt.store.name);
    println!("   Date:  {}", receipt.bought_date);
    println!();

    println!(
        "   {:>6}  {:<32}  {:>8}  {:>8}  {:>9}",
        "ITEM", "PRODUCT", "QTY", "PRICE", "SUBTOTAL"
    );
    println!("   {}", "-".repeat(71));
    for item in &receipt.items {
        println!(
            "   {:>6}  {:<32}  {:>8.3}  {:>8.2}  {:>9.2}",
            item.id,
            truncate(&item.product_name, 32),
            item.quantity,
            item.price_paid,
            item.subtotal
        );
    }
    println!();
    println!("   Subtotal:  {:>9.2}", receipt.subtotal);
    println!("   Discounts: {:>9.2}", receipt.discounts);
    println!("   Total:     {:>9.2}", receipt.total_amount);
}

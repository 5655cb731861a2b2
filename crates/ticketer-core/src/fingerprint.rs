//! Receipt content fingerprints for duplicate detection
//!
//! The fingerprint is SHA-256 over `store|date` followed by one
//! `|name:quantity:price` segment per item, with quantity rendered to three
//! decimals and price to two. Items are sorted first so extraction order never
//! changes the result.
//!
//! Store and item names are escaped (`\\`, `\|` and `\:`) so a name holding a
//! delimiter cannot mimic a segment boundary. Names without those characters
//! hash exactly as the plain layout above. Negative zero is rendered as zero.

use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use tracing::debug;

use crate::models::NewItem;

/// Compute the lowercase hex fingerprint of a receipt
pub fn receipt_fingerprint(store_name: &str, bought_date: &str, items: &[NewItem]) -> String {
    let mut sorted: Vec<&NewItem> = items.iter().collect();
    sorted.sort_by(|a, b| compare_items(a, b));

    let mut input = format!("{}|{}", escape(store_name), bought_date);
    for item in sorted {
        input.push_str(&format!(
            "|{}:{:.3}:{:.2}",
            escape(&item.name),
            item.quantity + 0.0,
            item.price + 0.0
        ));
    }
    debug!(input = %input, "Computing receipt fingerprint");

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '\\' | '|' | ':') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// Byte order on name; quantity and price only break ties between equal names
fn compare_items(a: &NewItem, b: &NewItem) -> Ordering {
    a.name
        .as_bytes()
        .cmp(b.name.as_bytes())
        .then_with(|| a.quantity.total_cmp(&b.quantity))
        .then_with(|| a.price.total_cmp(&b.price))
}

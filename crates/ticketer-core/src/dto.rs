//! Client-facing response shapes
//!
//! Derived amounts (line subtotals, receipt subtotal and total) are computed
//! here from the item values and never read from storage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ai::ExtractedReceipt;
use crate::models::{Receipt, ReceiptSummary, Store};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub price_paid: f64,
    /// quantity x price_paid
    pub subtotal: f64,
}

/// Full receipt detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptResponse {
    pub id: i64,
    pub store: StoreResponse,
    pub bought_date: NaiveDate,
    pub items: Vec<ItemResponse>,
    pub subtotal: f64,
    pub discounts: f64,
    pub total_amount: f64,
}

/// One row of a receipt list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptListItem {
    pub id: i64,
    pub store_name: String,
    pub item_count: i64,
    pub bought_date: NaiveDate,
    pub subtotal: f64,
    pub discounts: f64,
    pub total_amount: f64,
}

impl From<&Store> for StoreResponse {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
        }
    }
}

impl From<&Receipt> for ReceiptResponse {
    fn from(receipt: &Receipt) -> Self {
        let items: Vec<ItemResponse> = receipt
            .items
            .iter()
            .map(|item| ItemResponse {
                id: item.id,
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                price_paid: item.price_paid,
                subtotal: item.quantity * item.price_paid,
            })
            .collect();
        let subtotal: f64 = items.iter().map(|i| i.subtotal).sum();

        Self {
            id: receipt.id,
            store: StoreResponse::from(&receipt.store),
            bought_date: receipt.bought_date,
            items,
            subtotal,
            discounts: receipt.discounts,
            total_amount: subtotal - receipt.discounts,
        }
    }
}

impl From<Receipt> for ReceiptResponse {
    fn from(receipt: Receipt) -> Self {
        Self::from(&receipt)
    }
}

impl From<&ReceiptSummary> for ReceiptListItem {
    fn from(summary: &ReceiptSummary) -> Self {
        Self {
            id: summary.id,
            store_name: summary.store_name.clone(),
            item_count: summary.item_count,
            bought_date: summary.bought_date,
            subtotal: summary.subtotal,
            discounts: summary.discounts,
            total_amount: summary.subtotal - summary.discounts,
        }
    }
}

impl ReceiptResponse {
    /// Preview of an extraction that has not been stored (ids are 0)
    pub fn from_extracted(extracted: &ExtractedReceipt, bought_date: NaiveDate) -> Self {
        let items: Vec<ItemResponse> = extracted
            .items
            .iter()
            .map(|item| ItemResponse {
                id: 0,
                product_id: 0,
                product_name: item.name.clone(),
                quantity: item.quantity,
                price_paid: item.price,
                subtotal: item.quantity * item.price,
            })
            .collect();
        let subtotal: f64 = items.iter().map(|i| i.subtotal).sum();
        let discounts = extracted.discounts.unwrap_or(0.0);

        Self {
            id: 0,
            store: StoreResponse {
                id: 0,
                name: extracted.store_name.clone(),
            },
            bought_date,
            items,
            subtotal,
            discounts,
            total_amount: subtotal - discounts,
        }
    }
}

/// Map a list of summaries
pub fn receipt_list(summaries: &[ReceiptSummary]) -> Vec<ReceiptListItem> {
    summaries.iter().map(ReceiptListItem::from).collect()
}

//! Domain models for stores, products, receipts and line items

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used for purchase dates everywhere (storage, fingerprints, API)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A shop, identified by its unique name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub name: String,
}

/// A product name scoped to the store it was bought at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub store_id: i64,
}

/// A stored receipt with its store and line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub store: Store,
    pub bought_date: NaiveDate,
    /// Total discounts; a NULL column reads back as 0
    pub discounts: f64,
    pub receipt_hash: String,
    /// Ordered by product name
    pub items: Vec<ReceiptItem>,
}

impl Receipt {
    /// Sum of quantity x price over all items
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(ReceiptItem::subtotal).sum()
    }

    pub fn total(&self) -> f64 {
        self.subtotal() - self.discounts
    }
}

/// A line item joined with its product name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub id: i64,
    pub receipt_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub price_paid: f64,
}

impl ReceiptItem {
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.price_paid
    }
}

/// Input for creating a receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReceipt {
    pub store_name: String,
    /// `YYYY-MM-DD`; validated before any write
    pub bought_date: String,
    #[serde(default)]
    pub discounts: Option<f64>,
    pub items: Vec<NewItem>,
}

/// A line item as extracted from a receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub quantity: f64,
    pub price: f64,
}

/// Aggregated list view of a receipt, computed at read time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptSummary {
    pub id: i64,
    pub store_id: i64,
    pub store_name: String,
    pub item_count: i64,
    pub bought_date: NaiveDate,
    pub subtotal: f64,
    pub discounts: f64,
    pub total: f64,
}

/// Pagination window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 50;

    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

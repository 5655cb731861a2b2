//! Storage capability used by the receipt service
//!
//! Callers depend on [`ReceiptRepository`] rather than on [`Database`], so an
//! alternate storage engine only has to implement this trait.

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::Result;
use crate::models::{NewReceipt, Page, Receipt, ReceiptSummary};

pub trait ReceiptRepository: Send + Sync {
    fn create_receipt(&self, receipt: &NewReceipt) -> Result<i64>;
    fn get_receipt(&self, id: i64) -> Result<Receipt>;
    fn list_receipts(&self, page: Page) -> Result<Vec<ReceiptSummary>>;
    fn list_receipts_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        page: Page,
    ) -> Result<Vec<ReceiptSummary>>;
    fn receipts_by_store(&self, store_id: i64, page: Page) -> Result<Vec<ReceiptSummary>>;
    fn delete_receipt(&self, id: i64) -> Result<()>;
    fn update_item(&self, id: i64, quantity: f64, price_paid: f64) -> Result<()>;
    /// Flush pending state before shutdown
    fn close(&self) -> Result<()>;
}

impl ReceiptRepository for Database {
    fn create_receipt(&self, receipt: &NewReceipt) -> Result<i64> {
        Database::create_receipt(self, receipt)
    }

    fn get_receipt(&self, id: i64) -> Result<Receipt> {
        Database::get_receipt(self, id)
    }

    fn list_receipts(&self, page: Page) -> Result<Vec<ReceiptSummary>> {
        Database::list_receipts(self, page)
    }

    fn list_receipts_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        page: Page,
    ) -> Result<Vec<ReceiptSummary>> {
        Database::list_receipts_by_date_range(self, from, to, page)
    }

    fn receipts_by_store(&self, store_id: i64, page: Page) -> Result<Vec<ReceiptSummary>> {
        Database::receipts_by_store(self, store_id, page)
    }

    fn delete_receipt(&self, id: i64) -> Result<()> {
        Database::delete_receipt(self, id)
    }

    fn update_item(&self, id: i64, quantity: f64, price_paid: f64) -> Result<()> {
        Database::update_item(self, id, quantity, price_paid)
    }

    fn close(&self) -> Result<()> {
        self.checkpoint()
    }
}

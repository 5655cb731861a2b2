//! Receipt service: extraction, persistence and response assembly

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::ai::{AIClient, ExtractedReceipt};
use crate::db::parse_bought_date;
use crate::dto::{receipt_list, ReceiptListItem, ReceiptResponse};
use crate::error::{Error, Result};
use crate::models::{NewReceipt, Page};
use crate::repository::ReceiptRepository;

/// Coordinates the extraction backend and the receipt repository
#[derive(Clone)]
pub struct ReceiptService {
    extractor: Option<AIClient>,
    repo: Arc<dyn ReceiptRepository>,
}

impl ReceiptService {
    pub fn new(extractor: Option<AIClient>, repo: Arc<dyn ReceiptRepository>) -> Self {
        Self { extractor, repo }
    }

    /// Whether receipt images can be processed
    pub fn has_extractor(&self) -> bool {
        self.extractor.is_some()
    }

    pub fn extractor(&self) -> Option<&AIClient> {
        self.extractor.as_ref()
    }

    /// Run the extraction backend on an image without storing anything
    pub async fn extract(&self, image: &[u8], mime_type: &str) -> Result<ExtractedReceipt> {
        let extractor = self
            .extractor
            .as_ref()
            .ok_or_else(|| Error::Extraction("no extraction backend configured".into()))?;
        extractor.read_receipt(image, mime_type).await
    }

    /// Extract, store and return a receipt image.
    ///
    /// Extraction failures leave the database untouched. Duplicate and
    /// validation errors from the repository are returned as-is.
    pub async fn process_receipt(&self, image: &[u8], mime_type: &str) -> Result<ReceiptResponse> {
        let extracted = self.extract(image, mime_type).await?;
        let new_receipt = to_new_receipt(&extracted, Local::now().date_naive());

        let id = self.repo.create_receipt(&new_receipt)?;
        info!(receipt_id = id, store = %new_receipt.store_name, "Receipt saved to database");

        self.get_receipt(id)
    }

    pub fn get_receipt(&self, id: i64) -> Result<ReceiptResponse> {
        Ok(ReceiptResponse::from(self.repo.get_receipt(id)?))
    }

    pub fn list_receipts(&self, page: Page) -> Result<Vec<ReceiptListItem>> {
        Ok(receipt_list(&self.repo.list_receipts(page)?))
    }

    pub fn list_receipts_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        page: Page,
    ) -> Result<Vec<ReceiptListItem>> {
        Ok(receipt_list(
            &self.repo.list_receipts_by_date_range(from, to, page)?,
        ))
    }

    pub fn receipts_by_store(&self, store_id: i64, page: Page) -> Result<Vec<ReceiptListItem>> {
        Ok(receipt_list(&self.repo.receipts_by_store(store_id, page)?))
    }

    pub fn delete_receipt(&self, id: i64) -> Result<()> {
        self.repo.delete_receipt(id)
    }

    pub fn update_item(&self, id: i64, quantity: f64, price_paid: f64) -> Result<()> {
        self.repo.update_item(id, quantity, price_paid)
    }

    /// Release the repository (checkpoints SQLite)
    pub fn close(&self) -> Result<()> {
        self.repo.close()
    }
}

/// Resolve the purchase date of an extraction, using `today` when the model
/// could not read a valid one
pub fn resolve_bought_date(extracted: &ExtractedReceipt, today: NaiveDate) -> NaiveDate {
    match extracted.bought_date.as_deref() {
        Some(raw) => parse_bought_date(raw).unwrap_or_else(|_| {
            warn!(bought_date = %raw, "Unparseable purchase date from model, using today");
            today
        }),
        None => {
            warn!("No purchase date on receipt, using today");
            today
        }
    }
}

/// Turn an extraction into repository input
pub fn to_new_receipt(extracted: &ExtractedReceipt, today: NaiveDate) -> NewReceipt {
    NewReceipt {
        store_name: extracted.store_name.clone(),
        bought_date: resolve_bought_date(extracted, today)
            .format(crate::models::DATE_FORMAT)
            .to_string(),
        discounts: extracted.discounts,
        items: extracted.items.clone(),
    }
}

//! Mock backend for testing
//!
//! Returns a fixed ALDI receipt without any network access. Useful for unit
//! tests and for running the server without an API key.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::NewItem;

use super::types::ExtractedReceipt;
use super::ExtractionBackend;

/// Mock extraction backend
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// Receipt returned by `extract_receipt`
    pub receipt: ExtractedReceipt,
    /// When set, every call fails with this extraction error
    pub failure: Option<String>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            receipt: Self::sample_receipt(),
            failure: None,
        }
    }

    /// Create a mock that returns the given receipt
    pub fn with_receipt(receipt: ExtractedReceipt) -> Self {
        Self {
            receipt,
            ..Self::new()
        }
    }

    /// Create a mock whose calls all fail
    pub fn failing(message: &str) -> Self {
        Self {
            healthy: false,
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// The receipt a default mock returns
    pub fn sample_receipt() -> ExtractedReceipt {
        ExtractedReceipt {
            store_name: "ALDI".to_string(),
            bought_date: Some("2024-01-15".to_string()),
            items: vec![
                NewItem {
                    name: "Milk".to_string(),
                    quantity: 2.0,
                    price: 0.92,
                },
                NewItem {
                    name: "Bread".to_string(),
                    quantity: 1.0,
                    price: 1.20,
                },
            ],
            discounts: Some(0.50),
        }
    }

    fn check_failure(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(Error::Extraction(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionBackend for MockBackend {
    async fn identify_store(&self, _image: &[u8], _mime_type: &str) -> Result<String> {
        self.check_failure()?;
        Ok(self.receipt.store_name.to_uppercase())
    }

    async fn extract_receipt(
        &self,
        _image: &[u8],
        _mime_type: &str,
        _store_name: &str,
    ) -> Result<ExtractedReceipt> {
        self.check_failure()?;
        Ok(self.receipt.clone())
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

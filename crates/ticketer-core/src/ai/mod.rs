//! Receipt extraction backends
//!
//! # Architecture
//!
//! - `ExtractionBackend` trait: identify the store, then extract the receipt
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = Config::from_env();
//! if let Some(client) = AIClient::from_config(&config) {
//!     let receipt = client.read_receipt(&image, "image/jpeg").await?;
//!     println!("{}: {} items", receipt.store_name, receipt.items.len());
//! }
//! ```

mod gemini;
mod mock;
pub mod parsing;
pub mod types;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;
pub use types::*;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{BackendKind, Config};
use crate::error::Result;

/// Trait implemented by every extraction backend
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Read the store name from a receipt image (uppercase, `UNKNOWN` if unreadable)
    async fn identify_store(&self, image: &[u8], mime_type: &str) -> Result<String>;

    /// Extract line items using the rules for `store_name`
    async fn extract_receipt(
        &self,
        image: &[u8],
        mime_type: &str,
        store_name: &str,
    ) -> Result<ExtractedReceipt>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete extraction client enum
#[derive(Clone)]
pub enum AIClient {
    Gemini(GeminiBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create a client from configuration
    ///
    /// Returns None when the Gemini backend is selected but has no API key.
    pub fn from_config(config: &Config) -> Option<Self> {
        match config.backend {
            BackendKind::Mock => Some(AIClient::Mock(MockBackend::new())),
            BackendKind::Gemini => match GeminiBackend::new(&config.gemini) {
                Ok(backend) => Some(AIClient::Gemini(backend)),
                Err(e) => {
                    warn!(error = %e, "Gemini backend not available");
                    None
                }
            },
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    fn backend(&self) -> &dyn ExtractionBackend {
        match self {
            AIClient::Gemini(b) => b,
            AIClient::Mock(b) => b,
        }
    }

    /// Identify the store and extract the receipt in one go
    pub async fn read_receipt(&self, image: &[u8], mime_type: &str) -> Result<ExtractedReceipt> {
        info!(bytes = image.len(), mime_type, "Starting receipt extraction");
        let store_name = self.identify_store(image, mime_type).await?;
        self.extract_receipt(image, mime_type, &store_name).await
    }

    pub async fn identify_store(&self, image: &[u8], mime_type: &str) -> Result<String> {
        self.backend().identify_store(image, mime_type).await
    }

    pub async fn extract_receipt(
        &self,
        image: &[u8],
        mime_type: &str,
        store_name: &str,
    ) -> Result<ExtractedReceipt> {
        self.backend()
            .extract_receipt(image, mime_type, store_name)
            .await
    }

    pub async fn health_check(&self) -> bool {
        self.backend().health_check().await
    }

    pub fn model(&self) -> &str {
        self.backend().model()
    }

    pub fn host(&self) -> &str {
        self.backend().host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = Config::default();
        config.backend = BackendKind::Mock;
        assert!(matches!(AIClient::from_config(&config), Some(AIClient::Mock(_))));

        config.backend = BackendKind::Gemini;
        assert!(AIClient::from_config(&config).is_none());

        config.gemini.api_key = Some("key".into());
        assert!(matches!(
            AIClient::from_config(&config),
            Some(AIClient::Gemini(_))
        ));
    }

    #[tokio::test]
    async fn test_read_receipt_with_mock() {
        let client = AIClient::mock();
        let receipt = client.read_receipt(b"image", "image/jpeg").await.unwrap();
        assert_eq!(receipt.store_name, "ALDI");
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(client.model(), "mock");
    }

    #[tokio::test]
    async fn test_read_receipt_failure() {
        let client = AIClient::Mock(MockBackend::failing("model unavailable"));
        let err = client.read_receipt(b"image", "image/jpeg").await.unwrap_err();
        assert!(err.is_upstream());
        assert!(!client.health_check().await);
    }
}

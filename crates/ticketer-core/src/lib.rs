//! Ticketer Core Library
//!
//! Shared functionality for the Ticketer receipt ingestion backend:
//! - Receipt fingerprints for duplicate detection
//! - Database access, migrations and the store/product registry
//! - Transactional receipt writes and aggregated reads
//! - Response shapes with derived totals
//! - Vision model backends (Gemini, mock) with store-specific prompts
//! - Prompt library with user overrides

pub mod ai;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod prompts;
pub mod repository;
pub mod service;

/// Test utilities including mock Gemini server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIClient, ExtractedReceipt, ExtractionBackend, GeminiBackend, MockBackend};
pub use config::{BackendKind, Config, GeminiConfig, LogConfig, LogFormat};
pub use db::Database;
pub use dto::{ItemResponse, ReceiptListItem, ReceiptResponse, StoreResponse};
pub use error::{Error, Result};
pub use fingerprint::receipt_fingerprint;
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary, StoreKind};
pub use repository::ReceiptRepository;
pub use service::ReceiptService;

//! Error types for Ticketer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input rejected before anything was written
    #[error("Validation error: {0}")]
    Validation(String),

    /// A receipt with the same fingerprint is already stored
    #[error("Duplicate receipt (ID: {existing_id})")]
    Duplicate { existing_id: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    /// The vision model failed or returned something unusable
    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// True for failures caused by the upstream model service
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Extraction(_) | Error::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

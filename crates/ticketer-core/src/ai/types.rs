//! Types shared by extraction backends

use serde::{Deserialize, Serialize};

use crate::models::NewItem;

/// Store name returned when the model cannot read one
pub const UNKNOWN_STORE: &str = "UNKNOWN";

/// Structured data read from a receipt image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedReceipt {
    pub store_name: String,
    /// `YYYY-MM-DD` when the date was legible
    pub bought_date: Option<String>,
    pub items: Vec<NewItem>,
    pub discounts: Option<f64>,
}

/// Supported receipt image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Accepted upload extensions (lowercase, without the dot)
    pub const EXTENSIONS: &'static [&'static str] = &["jpg", "jpeg", "png"];

    /// Format for an accepted extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// MIME type for a file name; unknown extensions are sent as JPEG
    pub fn mime_for_path(path: &str) -> &'static str {
        std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(Self::Jpeg)
            .mime_type()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

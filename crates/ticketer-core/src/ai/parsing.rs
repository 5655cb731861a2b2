//! JSON parsing helpers for model responses
//!
//! Models occasionally wrap the JSON payload in prose or code fences, so the
//! outermost object is located before deserializing.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::NewItem;

use super::types::{ExtractedReceipt, UNKNOWN_STORE};

/// Receipt JSON as the model returns it; every field may be null
#[derive(Debug, Deserialize)]
struct RawReceipt {
    #[serde(default)]
    store_name: Option<String>,
    #[serde(default)]
    bought_date: Option<String>,
    #[serde(default)]
    items: Option<Vec<RawItem>>,
    #[serde(default)]
    discounts: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    name: String,
    #[serde(default)]
    quantity: Option<f64>,
    price: f64,
}

fn truncate(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Slice out the outermost `{...}` in a response
fn json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}

/// Parse an extraction response.
///
/// `identified_store` fills in a missing store name. Items without a quantity
/// count as one unit.
pub fn parse_receipt_response(response: &str, identified_store: &str) -> Result<ExtractedReceipt> {
    let response = response.trim();
    let json_str = json_object(response).ok_or_else(|| {
        Error::Extraction(format!(
            "No JSON found in model response | Raw: {}",
            truncate(response)
        ))
    })?;

    let raw: RawReceipt = serde_json::from_str(json_str).map_err(|e| {
        Error::Extraction(format!(
            "Invalid receipt JSON from model: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })?;

    let store_name = raw
        .store_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| identified_store.to_string());

    let items = raw
        .items
        .unwrap_or_default()
        .into_iter()
        .map(|item| NewItem {
            name: item.name.trim().to_string(),
            quantity: item.quantity.unwrap_or(1.0),
            price: item.price,
        })
        .collect();

    Ok(ExtractedReceipt {
        store_name,
        bought_date: raw.bought_date.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        items,
        discounts: raw.discounts,
    })
}

/// Normalize a store identification reply to an uppercase name
pub fn parse_store_name(response: &str) -> String {
    let name = response
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '*')
        .trim()
        .to_uppercase();

    if name.is_empty() {
        UNKNOWN_STORE.to_string()
    } else {
        name
    }
}

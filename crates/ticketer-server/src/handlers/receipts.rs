//! Receipt handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{page_from_query, AppError, AppState, MAX_UPLOAD_SIZE, UPLOAD_FIELD};
use ticketer_core::ai::ImageFormat;
use ticketer_core::db::parse_bought_date;
use ticketer_core::{ReceiptListItem, ReceiptResponse};

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Date range query parameters (`YYYY-MM-DD`, inclusive)
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: String,
    pub to: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body for PUT /api/items/:id
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: f64,
    pub price_paid: f64,
}

/// POST /api/receipts/upload - Extract and store a receipt image
///
/// Expects a multipart form with the image in the `receipt` field.
pub async fn upload_receipt(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ReceiptResponse>, AppError> {
    if !state.service.has_extractor() {
        return Err(AppError::service_unavailable(
            "Receipt extraction is not configured",
        ));
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to parse form: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let format = std::path::Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .ok_or_else(|| {
                AppError::bad_request("Invalid file format. Only JPG, JPEG, and PNG are allowed")
            })?;

        let bytes = field.bytes().await.map_err(|_| {
            AppError::bad_request("Invalid request body or file too large (max 10MB)")
        })?;
        upload = Some((file_name, format, bytes));
        break;
    }

    let (file_name, format, bytes) =
        upload.ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    if bytes.is_empty() {
        return Err(AppError::bad_request("No image data provided"));
    }
    if bytes.len() > MAX_UPLOAD_SIZE {
        return Err(AppError::bad_request("File too large (max 10MB)"));
    }

    info!(file = %file_name, bytes = bytes.len(), "Processing uploaded receipt");
    let receipt = state
        .service
        .process_receipt(&bytes, format.mime_type())
        .await?;

    Ok(Json(receipt))
}

/// GET /api/receipts - List receipts, newest purchase first
pub async fn list_receipts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<ReceiptListItem>>, AppError> {
    let page = page_from_query(params.limit, params.offset)?;
    Ok(Json(state.service.list_receipts(page)?))
}

/// GET /api/receipts/range - List receipts bought within a date range
pub async fn list_receipts_by_date_range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<ReceiptListItem>>, AppError> {
    let from = parse_bought_date(&params.from)?;
    let to = parse_bought_date(&params.to)?;
    let page = page_from_query(params.limit, params.offset)?;

    Ok(Json(
        state.service.list_receipts_by_date_range(from, to, page)?,
    ))
}

/// GET /api/receipts/:id - Get a receipt with items and totals
pub async fn get_receipt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ReceiptResponse>, AppError> {
    Ok(Json(state.service.get_receipt(id)?))
}

/// DELETE /api/receipts/:id - Delete a receipt and its items
pub async fn delete_receipt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.service.delete_receipt(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/items/:id - Update an item's quantity and price
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<StatusCode, AppError> {
    state.service.update_item(id, req.quantity, req.price_paid)?;
    Ok(StatusCode::NO_CONTENT)
}

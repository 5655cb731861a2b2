//! Store and product catalog handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::receipts::ListQuery;
use crate::{page_from_query, AppError, AppState};
use ticketer_core::models::{Product, Store};
use ticketer_core::ReceiptListItem;

/// GET /api/stores - List all stores
pub async fn list_stores(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Store>>, AppError> {
    Ok(Json(state.db.list_stores()?))
}

/// GET /api/stores/:id - Get a store
pub async fn get_store(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Store>, AppError> {
    Ok(Json(state.db.get_store(id)?))
}

/// GET /api/stores/:id/receipts - List a store's receipts
pub async fn store_receipts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<ReceiptListItem>>, AppError> {
    // 404 for unknown stores rather than an empty list
    state.db.get_store(id)?;
    let page = page_from_query(params.limit, params.offset)?;
    Ok(Json(state.service.receipts_by_store(id, page)?))
}

/// GET /api/stores/:id/products - List a store's products
pub async fn store_products(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Product>>, AppError> {
    state.db.get_store(id)?;
    Ok(Json(state.db.list_products_by_store(id)?))
}

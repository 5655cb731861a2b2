//! Receipt operations
//!
//! Writes go through [`Database::create_receipt`], which validates the input,
//! fingerprints it and stores the receipt with its items in one immediate
//! transaction. Totals are never stored: every read aggregates the current
//! item rows.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, ToSql, TransactionBehavior};
use tracing::{debug, info};

use super::products::upsert_product_on;
use super::stores::upsert_store_on;
use super::Database;
use crate::error::{Error, Result};
use crate::fingerprint::receipt_fingerprint;
use crate::models::*;

/// Receipt input after validation and normalization
struct ValidReceipt {
    store_name: String,
    bought_date: NaiveDate,
    discounts: Option<f64>,
    items: Vec<NewItem>,
}

/// Parse a `YYYY-MM-DD` purchase date
pub fn parse_bought_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        Error::Validation(format!(
            "invalid bought_date '{}': expected YYYY-MM-DD",
            value
        ))
    })
}

/// Check an item's quantity and unit price
pub fn validate_item_values(quantity: f64, price: f64) -> Result<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(Error::Validation(format!(
            "quantity must be greater than 0 (got {})",
            quantity
        )));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(Error::Validation(format!(
            "price must be 0 or greater (got {})",
            price
        )));
    }
    Ok(())
}

fn validate_receipt(receipt: &NewReceipt) -> Result<ValidReceipt> {
    let store_name = receipt.store_name.trim();
    if store_name.is_empty() {
        return Err(Error::Validation("store name is required".into()));
    }

    let bought_date = parse_bought_date(&receipt.bought_date)?;

    if let Some(discounts) = receipt.discounts {
        if !discounts.is_finite() || discounts < 0.0 {
            return Err(Error::Validation(format!(
                "discounts must be 0 or greater (got {})",
                discounts
            )));
        }
    }

    let mut items = Vec::with_capacity(receipt.items.len());
    for item in &receipt.items {
        let name = item.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("item name is required".into()));
        }
        validate_item_values(item.quantity, item.price)?;
        // `+ 0.0` folds -0.0 into 0.0
        items.push(NewItem {
            name: name.to_string(),
            quantity: item.quantity + 0.0,
            price: item.price + 0.0,
        });
    }

    Ok(ValidReceipt {
        store_name: store_name.to_string(),
        bought_date,
        discounts: receipt.discounts.map(|d| d + 0.0),
        items,
    })
}

fn validate_page(page: Page) -> Result<()> {
    if page.limit < 0 || page.offset < 0 {
        return Err(Error::Validation(format!(
            "limit and offset must be 0 or greater (got {}, {})",
            page.limit, page.offset
        )));
    }
    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Read a DATE column stored as `YYYY-MM-DD` text
fn date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Predicate for the shared summary query
enum SummaryFilter {
    All,
    DateRange(NaiveDate, NaiveDate),
    Store(i64),
}

impl Database {
    /// Store a receipt and its items atomically, returning the new receipt id.
    ///
    /// Fails with [`Error::Validation`] before touching the database when the
    /// input is malformed, and with [`Error::Duplicate`] when a receipt with
    /// the same fingerprint already exists. Any failure rolls back every row
    /// written by the call.
    pub fn create_receipt(&self, receipt: &NewReceipt) -> Result<i64> {
        let receipt = validate_receipt(receipt)?;
        let bought_date = receipt.bought_date.format(DATE_FORMAT).to_string();
        let hash = receipt_fingerprint(&receipt.store_name, &bought_date, &receipt.items);

        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock up front, so the duplicate check and
        // the inserts cannot interleave with another writer.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM receipts WHERE receipt_hash = ?",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(existing_id) = existing {
            debug!(existing_id, hash = %hash, "Rejecting duplicate receipt");
            return Err(Error::Duplicate { existing_id });
        }

        let store_id = upsert_store_on(&tx, &receipt.store_name)?;

        let inserted = tx.execute(
            "INSERT INTO receipts (store_id, discounts, receipt_hash, bought_date)
             VALUES (?, ?, ?, ?)",
            params![store_id, receipt.discounts, hash, bought_date],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                let existing_id: i64 = tx.query_row(
                    "SELECT id FROM receipts WHERE receipt_hash = ?",
                    params![hash],
                    |row| row.get(0),
                )?;
                return Err(Error::Duplicate { existing_id });
            }
            Err(e) => return Err(e.into()),
        }
        let receipt_id = tx.last_insert_rowid();

        for item in &receipt.items {
            let product_id = upsert_product_on(&tx, &item.name, store_id)?;
            tx.execute(
                "INSERT INTO items (receipt_id, product_id, quantity, price_paid)
                 VALUES (?, ?, ?, ?)",
                params![receipt_id, product_id, item.quantity, item.price],
            )?;
        }

        tx.commit()?;

        info!(
            receipt_id,
            store = %receipt.store_name,
            items = receipt.items.len(),
            "Receipt stored"
        );
        Ok(receipt_id)
    }

    /// Get a receipt with its store and items (items ordered by product name)
    pub fn get_receipt(&self, id: i64) -> Result<Receipt> {
        let mut conn = self.conn()?;
        // Header and items come from one snapshot
        let tx = conn.transaction()?;

        let receipt = tx
            .query_row(
                "SELECT r.id, s.id, s.name, r.bought_date, COALESCE(r.discounts, 0), r.receipt_hash
                 FROM receipts r
                 JOIN stores s ON s.id = r.store_id
                 WHERE r.id = ?",
                params![id],
                |row| {
                    Ok(Receipt {
                        id: row.get(0)?,
                        store: Store {
                            id: row.get(1)?,
                            name: row.get(2)?,
                        },
                        bought_date: date_column(row, 3)?,
                        discounts: row.get(4)?,
                        receipt_hash: row.get(5)?,
                        items: Vec::new(),
                    })
                },
            )
            .optional()?;

        let mut receipt = receipt.ok_or_else(|| Error::NotFound(format!("receipt {}", id)))?;

        receipt.items = {
            let mut stmt = tx.prepare(
                "SELECT i.id, i.receipt_id, i.product_id, p.name, i.quantity, i.price_paid
                 FROM items i
                 JOIN products p ON p.id = i.product_id
                 WHERE i.receipt_id = ?
                 ORDER BY p.name, i.id",
            )?;
            let items = stmt
                .query_map(params![id], Self::row_to_item)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            items
        };
        tx.commit()?;

        Ok(receipt)
    }

    /// Get a single line item
    pub fn get_item(&self, id: i64) -> Result<ReceiptItem> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT i.id, i.receipt_id, i.product_id, p.name, i.quantity, i.price_paid
             FROM items i
             JOIN products p ON p.id = i.product_id
             WHERE i.id = ?",
            params![id],
            Self::row_to_item,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("item {}", id)))
    }

    /// List receipt summaries, newest purchase first
    pub fn list_receipts(&self, page: Page) -> Result<Vec<ReceiptSummary>> {
        self.query_summaries(SummaryFilter::All, page)
    }

    /// List receipt summaries bought between `from` and `to` (inclusive)
    pub fn list_receipts_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        page: Page,
    ) -> Result<Vec<ReceiptSummary>> {
        if from > to {
            return Err(Error::Validation(format!(
                "date range start {} is after end {}",
                from, to
            )));
        }
        self.query_summaries(SummaryFilter::DateRange(from, to), page)
    }

    /// List receipt summaries for one store
    pub fn receipts_by_store(&self, store_id: i64, page: Page) -> Result<Vec<ReceiptSummary>> {
        self.query_summaries(SummaryFilter::Store(store_id), page)
    }

    /// Delete a receipt; its items go with it, stores and products stay
    pub fn delete_receipt(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM receipts WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("receipt {}", id)));
        }
        info!(receipt_id = id, "Receipt deleted");
        Ok(())
    }

    /// Change an item's quantity and price in place.
    ///
    /// The owning receipt's fingerprint is left as it was stored.
    pub fn update_item(&self, id: i64, quantity: f64, price_paid: f64) -> Result<()> {
        validate_item_values(quantity, price_paid)?;

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE items SET quantity = ?, price_paid = ? WHERE id = ?",
            params![quantity + 0.0, price_paid + 0.0, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("item {}", id)));
        }
        debug!(item_id = id, quantity, price_paid, "Item updated");
        Ok(())
    }

    fn query_summaries(&self, filter: SummaryFilter, page: Page) -> Result<Vec<ReceiptSummary>> {
        validate_page(page)?;

        let mut args: Vec<Box<dyn ToSql>> = Vec::new();
        let where_clause = match filter {
            SummaryFilter::All => "",
            SummaryFilter::DateRange(from, to) => {
                args.push(Box::new(from.format(DATE_FORMAT).to_string()));
                args.push(Box::new(to.format(DATE_FORMAT).to_string()));
                "WHERE r.bought_date BETWEEN ? AND ?"
            }
            SummaryFilter::Store(store_id) => {
                args.push(Box::new(store_id));
                "WHERE r.store_id = ?"
            }
        };
        args.push(Box::new(page.limit));
        args.push(Box::new(page.offset));

        // Ties on bought_date fall back to newest id first
        let sql = format!(
            "SELECT r.id, s.id, s.name, COUNT(i.id), r.bought_date,
                    COALESCE(SUM(i.quantity * i.price_paid), 0), COALESCE(r.discounts, 0)
             FROM receipts r
             JOIN stores s ON s.id = r.store_id
             LEFT JOIN items i ON i.receipt_id = r.id
             {}
             GROUP BY r.id
             ORDER BY r.bought_date DESC, r.id DESC
             LIMIT ? OFFSET ?",
            where_clause
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let summaries = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), |row| {
                let subtotal: f64 = row.get(5)?;
                let discounts: f64 = row.get(6)?;
                Ok(ReceiptSummary {
                    id: row.get(0)?,
                    store_id: row.get(1)?,
                    store_name: row.get(2)?,
                    item_count: row.get(3)?,
                    bought_date: date_column(row, 4)?,
                    subtotal,
                    discounts,
                    total: subtotal - discounts,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<ReceiptItem> {
        Ok(ReceiptItem {
            id: row.get(0)?,
            receipt_id: row.get(1)?,
            product_id: row.get(2)?,
            product_name: row.get(3)?,
            quantity: row.get(4)?,
            price_paid: row.get(5)?,
        })
    }
}

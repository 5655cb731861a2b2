//! Product registry (products are scoped to a store)

use rusqlite::{params, Connection, OptionalExtension};

use super::Database;
use crate::error::{Error, Result};
use crate::models::Product;

/// Insert-or-fetch a product by (name, store) in a single statement.
pub(crate) fn upsert_product_on(conn: &Connection, name: &str, store_id: i64) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO products (name, store_id) VALUES (?, ?)
         ON CONFLICT(name, store_id) DO UPDATE SET name = excluded.name
         RETURNING id",
        params![name, store_id],
        |row| row.get(0),
    )?;
    Ok(id)
}

impl Database {
    /// Upsert a product within a store, returning its id
    pub fn upsert_product(&self, name: &str, store_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        upsert_product_on(&conn, name, store_id)
    }

    /// Get a product by id
    pub fn get_product(&self, id: i64) -> Result<Product> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, store_id FROM products WHERE id = ?",
            params![id],
            Self::row_to_product,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("product {}", id)))
    }

    /// List a store's products ordered by name
    pub fn list_products_by_store(&self, store_id: i64) -> Result<Vec<Product>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, store_id FROM products WHERE store_id = ? ORDER BY name",
        )?;
        let products = stmt
            .query_map(params![store_id], Self::row_to_product)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(products)
    }

    fn row_to_product(row: &rusqlite::Row) -> rusqlite::Result<Product> {
        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            store_id: row.get(2)?,
        })
    }
}

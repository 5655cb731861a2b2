//! Store registry

use rusqlite::{params, Connection, OptionalExtension};

use super::Database;
use crate::error::{Error, Result};
use crate::models::Store;

/// Insert-or-fetch a store by name in a single statement.
///
/// Shared with the receipt writer so the upsert joins its transaction.
pub(crate) fn upsert_store_on(conn: &Connection, name: &str) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO stores (name) VALUES (?)
         ON CONFLICT(name) DO UPDATE SET name = excluded.name
         RETURNING id",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

impl Database {
    /// Upsert a store by name, returning its id
    pub fn upsert_store(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        upsert_store_on(&conn, name)
    }

    /// Get a store by id
    pub fn get_store(&self, id: i64) -> Result<Store> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name FROM stores WHERE id = ?",
            params![id],
            Self::row_to_store,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("store {}", id)))
    }

    /// Look up a store by its exact name
    pub fn find_store_by_name(&self, name: &str) -> Result<Option<Store>> {
        let conn = self.conn()?;
        let store = conn
            .query_row(
                "SELECT id, name FROM stores WHERE name = ?",
                params![name],
                Self::row_to_store,
            )
            .optional()?;
        Ok(store)
    }

    /// List all stores ordered by name
    pub fn list_stores(&self) -> Result<Vec<Store>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM stores ORDER BY name")?;
        let stores = stmt
            .query_map([], Self::row_to_store)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stores)
    }

    fn row_to_store(row: &rusqlite::Row) -> rusqlite::Result<Store> {
        Ok(Store {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

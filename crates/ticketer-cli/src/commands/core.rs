//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use ticketer_core::db::Database;

/// Open (and migrate) the database at `db_path`
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    db.checkpoint().context("Failed to checkpoint database")?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Set GEMINI_API_KEY for receipt extraction");
    println!("  2. Process a receipt: ticketer process --file ticket.jpg");
    println!("  3. Start the API: ticketer serve");

    Ok(())
}

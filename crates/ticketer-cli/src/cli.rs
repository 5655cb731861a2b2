//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ticketer - Turn receipt photos into structured purchases
#[derive(Parser)]
#[command(name = "ticketer")]
#[command(about = "Receipt ingestion backend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "ticketer.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Extract a receipt image and store it
    Process {
        /// Receipt image (JPG or PNG)
        #[arg(short, long)]
        file: PathBuf,

        /// Print the extraction without saving it
        #[arg(long)]
        dry_run: bool,
    },

    /// Browse and manage stored receipts
    Receipts {
        #[command(subcommand)]
        action: Option<ReceiptsAction>,
    },

    /// Edit receipt line items
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },

    /// Browse stores and their products
    Stores {
        #[command(subcommand)]
        action: Option<StoresAction>,
    },

    /// Manage extraction prompts
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum ReceiptsAction {
    /// List receipts, newest first
    List {
        /// Maximum number of receipts to show
        #[arg(short, long, default_value = "50")]
        limit: i64,

        /// Number of receipts to skip
        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// Show a receipt with its items and totals
    Show {
        /// Receipt ID
        id: i64,
    },

    /// Delete a receipt and its items
    Delete {
        /// Receipt ID
        id: i64,
    },

    /// List receipts bought within a date range (inclusive)
    Range {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        #[arg(short, long, default_value = "50")]
        limit: i64,

        #[arg(long, default_value = "0")]
        offset: i64,
    },
}

#[derive(Subcommand)]
pub enum ItemsAction {
    /// Correct the quantity and price of an item
    Update {
        /// Item ID
        id: i64,

        #[arg(short, long)]
        quantity: f64,

        /// Unit price paid
        #[arg(short, long)]
        price: f64,
    },
}

#[derive(Subcommand)]
pub enum StoresAction {
    /// List all stores
    List,

    /// List products seen at a store
    Products {
        /// Store ID
        id: i64,
    },

    /// List receipts from a store
    Receipts {
        /// Store ID
        id: i64,

        #[arg(short, long, default_value = "50")]
        limit: i64,

        #[arg(long, default_value = "0")]
        offset: i64,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List prompts and their override status
    List,

    /// Show a prompt's content
    Show {
        /// Prompt ID (e.g. aldi_rules)
        prompt_id: String,
    },

    /// Print the override directory
    Path,
}

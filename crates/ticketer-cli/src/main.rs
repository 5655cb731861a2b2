//! Ticketer CLI - Receipt ingestion backend
//!
//! Usage:
//!   ticketer init                    Initialize database
//!   ticketer process --file IMG      Extract and store a receipt photo
//!   ticketer receipts list           List stored receipts
//!   ticketer serve --port 3000       Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use ticketer_core::{Config, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > LOG_LEVEL (default info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.log.format {
        LogFormat::Compact => registry
            .with(fmt::layer().with_target(false).compact())
            .init(),
        LogFormat::Full => registry.with(fmt::layer()).init(),
    }

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Serve { port, host } => commands::cmd_serve(&cli.db, &host, port, &config).await,
        Commands::Process { file, dry_run } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_process(&db, &config, &file, dry_run).await
        }
        Commands::Receipts { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_receipts_list(&db, 50, 0),
                Some(ReceiptsAction::List { limit, offset }) => {
                    commands::cmd_receipts_list(&db, limit, offset)
                }
                Some(ReceiptsAction::Show { id }) => commands::cmd_receipts_show(&db, id),
                Some(ReceiptsAction::Delete { id }) => commands::cmd_receipts_delete(&db, id),
                Some(ReceiptsAction::Range {
                    from,
                    to,
                    limit,
                    offset,
                }) => commands::cmd_receipts_range(&db, &from, &to, limit, offset),
            }
        }
        Commands::Items { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                ItemsAction::Update {
                    id,
                    quantity,
                    price,
                } => commands::cmd_items_update(&db, id, quantity, price),
            }
        }
        Commands::Stores { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(StoresAction::List) => commands::cmd_stores_list(&db),
                Some(StoresAction::Products { id }) => commands::cmd_stores_products(&db, id),
                Some(StoresAction::Receipts { id, limit, offset }) => {
                    commands::cmd_stores_receipts(&db, id, limit, offset)
                }
            }
        }
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}

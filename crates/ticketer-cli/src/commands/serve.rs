//! Server command implementation

use std::path::Path;

use anyhow::Result;
use ticketer_core::{AIClient, Config};

use super::open_db;

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16, config: &Config) -> Result<()> {
    println!("🚀 Starting Ticketer web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let ai = AIClient::from_config(config);
    match ai {
        Some(ref client) => println!("   🤖 Extraction: {} ({})", client.host(), client.model()),
        None => {
            println!("   ⚠️  Extraction disabled: uploads will return 503");
            println!("      Set GEMINI_API_KEY to enable it");
        }
    }
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} (ALLOWED_ORIGINS)",
            config.allowed_origins.join(", ")
        );
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path)?;

    let server_config = ticketer_server::ServerConfig {
        allowed_origins: config.allowed_origins.clone(),
    };

    ticketer_server::serve(db, ai, host, port, server_config).await?;

    Ok(())
}

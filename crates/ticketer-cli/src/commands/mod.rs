//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db)
//! - `items` - Receipt item corrections
//! - `process` - Receipt image extraction
//! - `prompts` - Prompt library management commands
//! - `receipts` - Receipt listing, detail and deletion
//! - `serve` - Web server command
//! - `stores` - Store and product catalog commands

pub mod core;
pub mod items;
pub mod process;
pub mod prompts;
pub mod receipts;
pub mod serve;
pub mod stores;

// Re-export command functions for main.rs
pub use self::core::*;
pub use items::*;
pub use process::*;
pub use prompts::*;
pub use receipts::*;
pub use serve::*;
pub use stores::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

//! Receipt image processing command

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use ticketer_core::ai::ImageFormat;
use ticketer_core::service::resolve_bought_date;
use ticketer_core::{AIClient, Config, Database, ReceiptResponse, ReceiptService};
use tracing::info;

use super::receipts::print_receipt;

/// Extract a receipt image with the configured backend
pub async fn cmd_process(db: &Database, config: &Config, file: &Path, dry_run: bool) -> Result<()> {
    let Some(ai) = AIClient::from_config(config) else {
        bail!("No extraction backend configured. Set GEMINI_API_KEY (or AI_BACKEND=mock).");
    };
    process_with(db, ai, file, dry_run).await
}

/// Extract with an explicit client; `dry_run` skips the database write
pub async fn process_with(db: &Database, ai: AIClient, file: &Path, dry_run: bool) -> Result<()> {
    let format = file
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension);
    let Some(format) = format else {
        bail!(
            "Unsupported image format: {} (expected {})",
            file.display(),
            ImageFormat::EXTENSIONS.join(", ")
        );
    };

    let image = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    info!(file = %file.display(), bytes = image.len(), dry_run, "Processing receipt image");
    println!("🧾 Processing {}...", file.display());
    println!("   🤖 Backend: {} ({})", ai.host(), ai.model());

    let service = ReceiptService::new(Some(ai), Arc::new(db.clone()));

    if dry_run {
        let extracted = service.extract(&image, format.mime_type()).await?;
        let bought_date = resolve_bought_date(&extracted, Local::now().date_naive());
        let response = ReceiptResponse::from_extracted(&extracted, bought_date);
        print_receipt(&response);
        println!();
        println!("ℹ️  Dry run: nothing was saved");
        return Ok(());
    }

    let response = service.process_receipt(&image, format.mime_type()).await?;
    print_receipt(&response);
    println!();
    println!("✅ Saved as receipt #{}", response.id);

    Ok(())
}

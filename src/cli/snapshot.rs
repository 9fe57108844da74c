//! Snapshot management commands

use colored::Colorize;

use crate::cli::{CommandContext, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::output::format_json;
use crate::snapshot::{SNAPSHOT_META_FILE, SnapshotMetadata, SnapshotStore};

/// Refresh the inventory snapshot.
pub async fn refresh(ctx: &CommandContext, force: bool, max_age_minutes: Option<f64>) -> Result<()> {
    let max_age = max_age_minutes.unwrap_or_else(|| ctx.max_snapshot_age_minutes());
    let outcome = ctx.store.refresh(force, max_age).await?;

    match ctx.format {
        OutputFormat::Json => println!("{}", format_json(&outcome)?),
        _ => {
            let verb = match outcome.status {
                crate::snapshot::RefreshStatus::Fresh => "Snapshot already fresh",
                crate::snapshot::RefreshStatus::LoadedFromDisk => "Snapshot loaded from disk",
                crate::snapshot::RefreshStatus::Rebuilt => "Snapshot rebuilt",
            };
            println!("{} {}", "✓".green(), verb);
            if let Some(age) = outcome.age_minutes {
                println!("Age: {:.1} minutes", age);
            }
            for (family, count) in &outcome.counts {
                println!("  {:<14} {}", family, count);
            }
        }
    }

    Ok(())
}

/// Show snapshot metadata without deserializing the full document.
pub fn info(format: OutputFormat, config_path: Option<&str>) -> Result<()> {
    let dir = match Config::load_at(config_path) {
        Ok(config) => config
            .cache_dir
            .map(Ok)
            .unwrap_or_else(SnapshotStore::default_cache_dir)?,
        Err(_) => SnapshotStore::default_cache_dir()?,
    };

    let raw = match std::fs::read(dir.join(SNAPSHOT_META_FILE)) {
        Ok(raw) => raw,
        Err(_) => {
            println!("{} No snapshot cached in {}", "○".dimmed(), dir.display());
            println!("Run {} to build one.", "tenop snapshot refresh".cyan());
            return Ok(());
        }
    };
    let meta: SnapshotMetadata = serde_json::from_slice(&raw)
        .map_err(|e| crate::error::SnapshotError::Load(e.to_string()))?;

    match format {
        OutputFormat::Json => println!("{}", format_json(&meta)?),
        _ => {
            println!("Snapshot Metadata");
            println!("────────────────────────────────────────");
            println!("Tenancy:     {}", meta.tenancy_id);
            println!("Region:      {}", meta.region);
            println!("Profile:     {}", meta.profile);
            println!("Generated:   {}", meta.generated_at.to_rfc3339());
            println!(
                "Age:         {:.1} minutes",
                meta.age_minutes(chrono::Utc::now())
            );
            for (family, count) in &meta.counts {
                println!("  {:<14} {}", family, count);
            }
        }
    }

    Ok(())
}

//! Status command implementation

use colored::Colorize;

use crate::config::Config;
use crate::error::Result;
use crate::snapshot::{SNAPSHOT_META_FILE, SnapshotMetadata, SnapshotStore};

/// Display configuration and snapshot status.
pub fn run(config_path: Option<&str>) -> Result<()> {
    println!("{}\n", "Tenop Configuration Status".bold());

    let config = match Config::load_at(config_path) {
        Ok(config) => config,
        Err(_) => {
            println!("{} Configuration not found", "✗".red());
            println!();
            println!("Run {} to create a configuration file.", "tenop init".cyan());
            return Ok(());
        }
    };

    let path = Config::resolve_path(config_path)?;
    println!("Config file: {}", path.display().to_string().cyan());
    println!("Profile: {}", config.profile.bold());
    println!();

    if config.api_key.is_some() {
        println!("{} API key configured", "✓".green());
    } else {
        println!("{} API key not configured", "✗".red());
        println!("  → Run 'tenop init --api-key <KEY>'");
    }

    match config.tenancy_id.as_deref() {
        Some(tenancy) => println!("{} Tenancy: {}", "✓".green(), tenancy),
        None => {
            println!("{} No tenancy configured", "✗".red());
            println!("  → Run 'tenop init --tenancy <ID>'");
        }
    }
    println!("{} Region: {}", "✓".green(), config.region());

    if let Some(ref endpoint) = config.endpoint {
        println!("{} Custom endpoint: {}", "○".dimmed(), endpoint.cyan());
    }

    println!();
    match snapshot_metadata(&config) {
        Some(meta) => {
            let age = meta.age_minutes(chrono::Utc::now());
            println!(
                "{} Snapshot available ({} items, {:.0} minutes old)",
                "✓".green(),
                meta.counts.values().sum::<usize>(),
                age
            );
        }
        None => {
            println!("{} No snapshot cached", "○".dimmed());
            println!("  → Run 'tenop snapshot refresh' to build one");
        }
    }

    println!();
    Ok(())
}

/// Read the metadata artifact directly; status must stay cheap.
fn snapshot_metadata(config: &Config) -> Option<SnapshotMetadata> {
    let dir = config
        .cache_dir
        .clone()
        .or_else(|| SnapshotStore::default_cache_dir().ok())?;
    let raw = std::fs::read(dir.join(SNAPSHOT_META_FILE)).ok()?;
    serde_json::from_slice(&raw).ok()
}
